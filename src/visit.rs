use crate::ast::{
    Declaration, Definition, Expr, ExprKind, FuncDef, Program, Stmt, StmtKind, TypeAnnotation,
    TypeAnnotationKind, VarDef,
};

/// A pass over the AST.
///
/// Each `walk_*` method calls the matching `visit_*` hook and then, if
/// [`Visitor::traverse`] holds, walks the children in field order. A visitor
/// which does not traverse must walk the sub-nodes it cares about itself.
pub trait Visitor {
    type Err;

    fn traverse(&self) -> bool {
        true
    }

    fn visit_program(&mut self, _el: &Program) -> Result<(), Self::Err> {
        Ok(())
    }
    fn visit_var_def(&mut self, _el: &VarDef) -> Result<(), Self::Err> {
        Ok(())
    }
    fn visit_func_def(&mut self, _el: &FuncDef) -> Result<(), Self::Err> {
        Ok(())
    }
    /// Called once all of the function's children have been walked.
    fn leave_func_def(&mut self, _el: &FuncDef) -> Result<(), Self::Err> {
        Ok(())
    }
    fn visit_declaration(&mut self, _el: &Declaration) -> Result<(), Self::Err> {
        Ok(())
    }
    fn visit_stmt(&mut self, _el: &Stmt) -> Result<(), Self::Err> {
        Ok(())
    }
    fn visit_expr(&mut self, _el: &Expr) -> Result<(), Self::Err> {
        Ok(())
    }
    fn visit_type(&mut self, _el: &TypeAnnotation) -> Result<(), Self::Err> {
        Ok(())
    }

    fn walk_program(&mut self, el: &Program) -> Result<(), Self::Err> {
        self.visit_program(el)?;
        if !self.traverse() {
            return Ok(());
        }
        for definition in &el.definitions {
            match definition {
                Definition::Var(var_def) => self.walk_var_def(var_def)?,
                Definition::Func(func_def) => self.walk_func_def(func_def)?,
            }
        }
        self.walk_stmts(&el.statements)
    }

    fn walk_var_def(&mut self, el: &VarDef) -> Result<(), Self::Err> {
        self.visit_var_def(el)?;
        if !self.traverse() {
            return Ok(());
        }
        self.walk_type(&el.var.ty)?;
        self.walk_expr(&el.value)
    }

    fn walk_func_def(&mut self, el: &FuncDef) -> Result<(), Self::Err> {
        self.visit_func_def(el)?;
        if self.traverse() {
            let FuncDef {
                name: _,
                params,
                return_ty,
                declarations,
                body,
                span: _,
            } = el;
            for param in params {
                self.walk_type(&param.ty)?;
            }
            if let Some(return_ty) = return_ty {
                self.walk_type(return_ty)?;
            }
            for declaration in declarations {
                self.walk_declaration(declaration)?;
            }
            self.walk_stmts(body)?;
        }
        self.leave_func_def(el)
    }

    fn walk_declaration(&mut self, el: &Declaration) -> Result<(), Self::Err> {
        self.visit_declaration(el)?;
        match el {
            Declaration::Var(var_def) if self.traverse() => self.walk_var_def(var_def),
            _ => Ok(()),
        }
    }

    fn walk_stmts(&mut self, stmts: &[Stmt]) -> Result<(), Self::Err> {
        for stmt in stmts {
            self.walk_stmt(stmt)?;
        }
        Ok(())
    }

    fn walk_stmt(&mut self, el: &Stmt) -> Result<(), Self::Err> {
        self.visit_stmt(el)?;
        if !self.traverse() {
            return Ok(());
        }
        match &el.kind {
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.walk_expr(cond)?;
                self.walk_stmts(then_body)?;
                self.walk_stmts(else_body)
            }
            StmtKind::While { cond, body } => {
                self.walk_expr(cond)?;
                self.walk_stmts(body)
            }
            StmtKind::For {
                target: _,
                iter,
                body,
            } => {
                self.walk_expr(iter)?;
                self.walk_stmts(body)
            }
            StmtKind::Pass | StmtKind::Return(None) => Ok(()),
            StmtKind::Return(Some(expr)) | StmtKind::Expr(expr) => self.walk_expr(expr),
            StmtKind::Assign { targets, value } => {
                for target in targets {
                    self.walk_expr(target)?;
                }
                self.walk_expr(value)
            }
        }
    }

    fn walk_expr(&mut self, el: &Expr) -> Result<(), Self::Err> {
        self.visit_expr(el)?;
        if !self.traverse() {
            return Ok(());
        }
        match &el.kind {
            ExprKind::Literal(_) | ExprKind::Ident(_) => Ok(()),
            ExprKind::Unary { op: _, expr } => self.walk_expr(expr),
            ExprKind::Binary { op: _, lhs, rhs } => {
                self.walk_expr(lhs)?;
                self.walk_expr(rhs)
            }
            ExprKind::IfExpr {
                cond,
                then_arm,
                else_arm,
            } => {
                self.walk_expr(cond)?;
                self.walk_expr(then_arm)?;
                self.walk_expr(else_arm)
            }
            ExprKind::List(elements) | ExprKind::Call { func: _, args: elements } => {
                for element in elements {
                    self.walk_expr(element)?;
                }
                Ok(())
            }
            ExprKind::Index { value, index } => {
                self.walk_expr(value)?;
                self.walk_expr(index)
            }
        }
    }

    fn walk_type(&mut self, el: &TypeAnnotation) -> Result<(), Self::Err> {
        self.visit_type(el)?;
        match &el.kind {
            TypeAnnotationKind::List(inner) if self.traverse() => self.walk_type(inner),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_utils::parse_program;

    #[derive(Default)]
    struct Counter {
        exprs: usize,
        stmts: usize,
        funcs_left: usize,
    }

    impl Visitor for Counter {
        type Err = ();

        fn visit_expr(&mut self, _: &Expr) -> Result<(), ()> {
            self.exprs += 1;
            Ok(())
        }

        fn visit_stmt(&mut self, _: &Stmt) -> Result<(), ()> {
            self.stmts += 1;
            Ok(())
        }

        fn leave_func_def(&mut self, _: &FuncDef) -> Result<(), ()> {
            self.funcs_left += 1;
            Ok(())
        }
    }

    struct Shallow(usize);

    impl Visitor for Shallow {
        type Err = ();

        fn traverse(&self) -> bool {
            false
        }

        fn visit_program(&mut self, el: &Program) -> Result<(), ()> {
            for stmt in &el.statements {
                self.walk_stmt(stmt)?;
            }
            Ok(())
        }

        fn visit_stmt(&mut self, _: &Stmt) -> Result<(), ()> {
            self.0 += 1;
            Ok(())
        }
    }

    const SRC: &str = "x: int = 1\ndef f(a: int) -> int:\n    return a\nif x > 0:\n    print(f(x))\n";

    #[test]
    fn test_walks_every_expression() {
        let (_, program) = parse_program(SRC);
        let mut counter = Counter::default();
        counter.walk_program(&program).unwrap();
        assert_eq!(counter.exprs, program.expr_count as usize);
        // return, if, print(...)
        assert_eq!(counter.stmts, 3);
        assert_eq!(counter.funcs_left, 1);
    }

    #[test]
    fn test_no_traversal_only_visits_explicit_nodes() {
        let (_, program) = parse_program(SRC);
        let mut shallow = Shallow(0);
        shallow.walk_program(&program).unwrap();
        // Only the top level `if`, without its body.
        assert_eq!(shallow.0, 1);
    }
}
