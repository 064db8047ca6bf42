//! Control flow: every branch, loop head and jump target becomes a block.

use solhorn_smtlib::Term;

use super::{Encoder, LoopTargets};
use crate::ast::{Block, ForStatement, IfStatement, Jump, Return, Statement, WhileStatement};
use crate::predicate::{PredicateId, PredicateKind};
use crate::symbolic::default_symbolic;

impl<'a, 's> Encoder<'a, 's> {
    pub(super) fn visit_block(&mut self, block: &'a Block) {
        for statement in &block.statements {
            self.visit_statement(statement);
        }
    }

    fn visit_statement(&mut self, statement: &'a Statement) {
        match statement {
            Statement::Block(block) => self.visit_block(block),
            Statement::VariableDeclaration(decl) => {
                let value = match &decl.value {
                    Some(init) => self.expression(init),
                    None => default_symbolic(&decl.ty),
                };
                self.assign_variable(decl, value);
            }
            Statement::Expression(expression) => {
                self.expression(expression);
            }
            Statement::If(s) => self.visit_if(s),
            Statement::While(s) => self.visit_while(s),
            Statement::For(s) => self.visit_for(s),
            Statement::Break(jump) => self.visit_jump(jump, true),
            Statement::Continue(jump) => self.visit_jump(jump, false),
            Statement::Return(r) => self.visit_return(r),
        }
    }

    fn visit_if(&mut self, s: &'a IfStatement) {
        let outer_unknown = std::mem::replace(&mut self.unknown_call_seen, false);

        let header = self.create_block(PredicateKind::FunctionBlock, s.id, "if_header_");
        let true_block = self.create_block(PredicateKind::FunctionBlock, s.true_body.id(), "if_true_");
        let false_block = s
            .false_body
            .as_ref()
            .map(|body| self.create_block(PredicateKind::FunctionBlock, body.id(), "if_false_"));
        let after = self.create_after_block();

        self.jump_to(header, Term::BoolLit(true));
        self.set_current_block(header);
        let condition = self.expression(&s.condition).scalar();
        self.jump_to(true_block, condition.clone());
        self.jump_to(false_block.unwrap_or(after), Term::not(condition));

        self.set_current_block(true_block);
        self.visit_statement(&s.true_body);
        self.jump_to(after, Term::BoolLit(true));

        if let (Some(block), Some(body)) = (false_block, &s.false_body) {
            self.set_current_block(block);
            self.visit_statement(body);
            self.jump_to(after, Term::BoolLit(true));
        }

        self.set_current_block(after);
        self.leave_branching(outer_unknown);
    }

    fn visit_while(&mut self, s: &'a WhileStatement) {
        let outer_unknown = std::mem::replace(&mut self.unknown_call_seen, false);
        let prefix = if s.is_do_while { "do_while" } else { "while" };

        let header = self.create_block(PredicateKind::FunctionBlock, s.id, &format!("{prefix}_header_"));
        let body = self.create_block(PredicateKind::FunctionBlock, s.body.id(), &format!("{prefix}_body_"));
        let after = self.create_after_block();

        self.loops.push(LoopTargets {
            break_to: after,
            continue_to: header,
        });

        // The first iteration of a do-while runs before the condition.
        if s.is_do_while {
            self.visit_statement(&s.body);
        }

        self.jump_to(header, Term::BoolLit(true));
        self.set_current_block(header);
        let condition = self.expression(&s.condition).scalar();
        self.jump_to(body, condition.clone());
        self.jump_to(after, Term::not(condition));

        self.set_current_block(body);
        self.visit_statement(&s.body);
        self.loops.pop();
        self.jump_to(header, Term::BoolLit(true));

        self.set_current_block(after);
        self.leave_branching(outer_unknown);
    }

    fn visit_for(&mut self, s: &'a ForStatement) {
        let outer_unknown = std::mem::replace(&mut self.unknown_call_seen, false);

        let header = self.create_block(PredicateKind::FunctionBlock, s.id, "for_header_");
        let body = self.create_block(PredicateKind::FunctionBlock, s.body.id(), "for_body_");
        let post = s
            .post
            .as_ref()
            .map(|post| self.create_block(PredicateKind::FunctionBlock, post.id, "for_post_"));
        let after = self.create_after_block();

        self.loops.push(LoopTargets {
            break_to: after,
            continue_to: post.unwrap_or(header),
        });

        if let Some(init) = &s.init {
            self.visit_statement(init);
        }

        self.jump_to(header, Term::BoolLit(true));
        self.set_current_block(header);
        let condition = match &s.condition {
            Some(condition) => self.expression(condition).scalar(),
            None => Term::BoolLit(true),
        };
        self.jump_to(body, condition.clone());
        self.jump_to(after, Term::not(condition));

        self.set_current_block(body);
        self.visit_statement(&s.body);

        if let (Some(block), Some(expression)) = (post, &s.post) {
            self.jump_to(block, Term::BoolLit(true));
            self.set_current_block(block);
            self.expression(expression);
        }

        self.loops.pop();
        self.jump_to(header, Term::BoolLit(true));

        self.set_current_block(after);
        self.leave_branching(outer_unknown);
    }

    /// `break` / `continue`: jump out, then continue in an unreachable
    /// ghost block so that any dead code after the jump still has a home.
    fn visit_jump(&mut self, jump: &'a Jump, is_break: bool) {
        let (targets, label) = match self.loops.last() {
            Some(targets) if is_break => (targets.break_to, "break_ghost_"),
            Some(targets) => (targets.continue_to, "continue_ghost_"),
            None => panic!("jump {} outside a loop", jump.id),
        };
        self.jump_to(targets, Term::BoolLit(true));
        let ghost = self.create_block(PredicateKind::FunctionBlock, jump.id, label);
        self.current_block = self.render(ghost);
    }

    fn visit_return(&mut self, r: &'a Return) {
        if let Some(expression) = &r.expression {
            let value = self.expression(expression);
            let function = self.current_function();
            match function.returns.as_slice() {
                [single] => self.assign_variable(single, value),
                returns => panic!(
                    "return with a value in {} which has {} return variables",
                    function.display_name(),
                    returns.len()
                ),
            }
        }
        let target = self
            .return_block
            .unwrap_or_else(|| panic!("return {} outside a function body", r.id));
        self.jump_to(target, Term::BoolLit(true));
        let ghost = self.create_block(PredicateKind::FunctionBlock, r.id, "return_ghost_");
        self.current_block = self.render(ghost);
    }

    /// Join point after a branch or loop, named after the function body.
    fn create_after_block(&mut self) -> PredicateId {
        let function = self.current_function();
        let node = function.body.as_ref().map_or(function.id, |body| body.id);
        self.create_block(PredicateKind::FunctionBlock, node, "")
    }

    /// Rule from the current block to `target` rendered at current versions.
    fn jump_to(&mut self, target: PredicateId, constraints: Term) {
        let to = self.render(target);
        self.connect(self.current_block.clone(), to, constraints);
    }

    fn leave_branching(&mut self, outer_unknown: bool) {
        if self.unknown_call_seen {
            self.erase_knowledge();
        }
        self.unknown_call_seen = outer_unknown;
    }
}
