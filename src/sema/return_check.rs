//! Return-path classification: every control path through a function
//! body either always, sometimes, or never returns.

use crate::sir::{BlockId, Stmt};

use super::SemanticAnalyzer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReturnResult {
    Always,
    Sometimes,
    Never,
}

impl<'u, 'a> SemanticAnalyzer<'u, 'a> {
    pub(crate) fn check_returns(&mut self, block: BlockId) -> ReturnResult {
        let stmts = self.unit.blocks[block].stmts.clone();

        if stmts.is_empty() {
            return ReturnResult::Never;
        }

        let mut result = ReturnResult::Never;

        for stmt in stmts {
            if result == ReturnResult::Always {
                let ast = self.unit.stmts[stmt].ast();
                self.warn_unreachable_code(ast);
                return result;
            }

            match self.unit.stmts[stmt].clone() {
                Stmt::Return(_) => result = ReturnResult::Always,
                Stmt::Block(inner) => result = self.check_returns(inner),
                Stmt::If(if_stmt) => {
                    result = self.check_if_returns(&if_stmt);
                }
                _ => {}
            }
        }

        result
    }

    fn check_if_returns(&mut self, if_stmt: &crate::sir::IfStmt<'a>) -> ReturnResult {
        let mut returns_always = true;
        let mut has_any_return = false;

        for branch in &if_stmt.cond_branches {
            self.check_branch(branch.block, &mut returns_always, &mut has_any_return);
        }

        match &if_stmt.else_branch {
            Some(else_branch) => {
                self.check_branch(else_branch.block, &mut returns_always, &mut has_any_return);
            }
            None => returns_always = false,
        }

        if returns_always {
            ReturnResult::Always
        } else if has_any_return {
            ReturnResult::Sometimes
        } else {
            ReturnResult::Never
        }
    }

    fn check_branch(
        &mut self,
        block: BlockId,
        returns_always: &mut bool,
        has_any_return: &mut bool,
    ) {
        match self.check_returns(block) {
            ReturnResult::Always => *has_any_return = true,
            ReturnResult::Sometimes => {
                *returns_always = false;
                *has_any_return = true;
            }
            ReturnResult::Never => *returns_always = false,
        }
    }
}
