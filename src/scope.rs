use std::collections::HashMap;

use log::debug;

use crate::{
    ast::{Declaration, Definition, Expr, ExprKind, FuncDef, Ident, Program, Stmt, StmtKind, VarDef},
    token::Spanned,
    util::intern::{well_known, Symbol},
    visit::Visitor,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Runs the name-scope analyses over the program: assignment targets are
/// validated, the scope tree is built, and then every name use is resolved
/// against it.
pub fn check(program: &Program) -> Result<ScopeTree> {
    AssignTargets.walk_program(program)?;

    let mut builder = ScopeBuilder {
        tree: ScopeTree::new(),
    };
    builder.walk_program(program)?;
    let tree = builder.tree;
    debug!("built {} scopes", tree.scopes.len());

    let mut checker = ScopeChecker {
        tree: &tree,
        current: ScopeTree::ROOT,
    };
    checker.walk_program(program)?;
    Ok(tree)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScopeId(u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Binding {
    Var,
    Func(ScopeId),
    Builtin,
}

#[derive(Debug)]
pub struct Scope {
    parent: Option<ScopeId>,
    names: HashMap<Symbol, Binding>,
}

/// Scopes are kept in an arena; the program's root scope always comes first.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub const ROOT: ScopeId = ScopeId(0);

    fn new() -> ScopeTree {
        let mut root = Scope {
            parent: None,
            names: HashMap::with_capacity(32),
        };
        for &builtin in well_known::BUILTINS {
            root.names.insert(builtin, Binding::Builtin);
        }
        ScopeTree { scopes: vec![root] }
    }

    fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).unwrap());
        self.scopes.push(Scope {
            parent: Some(parent),
            names: HashMap::new(),
        });
        id
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    fn define(&mut self, scope: ScopeId, ident: Ident, binding: Binding) -> Result<()> {
        let names = &mut self.scopes[scope.0 as usize].names;
        if names.contains_key(&ident.name) {
            return Err(ident.span.wrap(Error::IdentifierAlreadyDefined(ident.name)));
        }
        names.insert(ident.name, binding);
        Ok(())
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scope(scope).parent
    }

    /// The binding of the name in exactly this scope.
    pub fn get(&self, scope: ScopeId, name: Symbol) -> Option<Binding> {
        self.scope(scope).names.get(&name).copied()
    }

    pub fn contains(&self, scope: ScopeId, name: Symbol) -> bool {
        self.get(scope, name).is_some()
    }

    /// Looks the name up in this scope and then in every ancestor.
    pub fn resolve(&self, scope: ScopeId, name: Symbol) -> Option<Binding> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(binding) = self.get(id, name) {
                return Some(binding);
            }
            current = self.parent(id);
        }
        None
    }

    /// Whether a strict ancestor of the scope, other than the root, binds the
    /// name.
    pub fn parent_scope_contains(&self, scope: ScopeId, name: Symbol) -> bool {
        let mut current = self.parent(scope);
        while let Some(id) = current {
            if id == Self::ROOT {
                return false;
            }
            if self.contains(id, name) {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn global_scope_contains(&self, name: Symbol) -> bool {
        self.contains(Self::ROOT, name)
    }

    /// The inner scope of a function defined in `scope`.
    pub fn func_scope(&self, scope: ScopeId, name: Symbol) -> Option<ScopeId> {
        match self.get(scope, name) {
            Some(Binding::Func(id)) => Some(id),
            _ => None,
        }
    }
}

/// Rejects assignments to anything other than identifiers and indexes.
struct AssignTargets;

impl Visitor for AssignTargets {
    type Err = Spanned<Error>;

    fn visit_stmt(&mut self, el: &Stmt) -> Result<()> {
        if let StmtKind::Assign { targets, value: _ } = &el.kind {
            for target in targets {
                if !matches!(target.kind, ExprKind::Ident(_) | ExprKind::Index { .. }) {
                    return Err(target.span.wrap(Error::AssignTargetInvalid));
                }
            }
        }
        Ok(())
    }
}

/// Records every definition in its scope. Doesn't traverse: only definitions
/// and declarations introduce names.
struct ScopeBuilder {
    tree: ScopeTree,
}

impl ScopeBuilder {
    fn define_var(&mut self, scope: ScopeId, var_def: &VarDef) -> Result<()> {
        self.tree.define(scope, var_def.var.name, Binding::Var)
    }

    fn define_func(&mut self, scope: ScopeId, func_def: &FuncDef) -> Result<()> {
        let inner = self.tree.push(scope);
        self.tree.define(scope, func_def.name, Binding::Func(inner))?;
        for param in &func_def.params {
            self.tree.define(inner, param.name, Binding::Var)?;
        }
        for declaration in &func_def.declarations {
            match declaration {
                Declaration::Var(var_def) => self.define_var(inner, var_def)?,
                Declaration::Global(name) | Declaration::NonLocal(name) => {
                    self.tree.define(inner, *name, Binding::Var)?;
                }
            }
        }
        Ok(())
    }
}

impl Visitor for ScopeBuilder {
    type Err = Spanned<Error>;

    fn traverse(&self) -> bool {
        false
    }

    fn visit_program(&mut self, el: &Program) -> Result<()> {
        for definition in &el.definitions {
            match definition {
                Definition::Var(var_def) => self.define_var(ScopeTree::ROOT, var_def)?,
                Definition::Func(func_def) => self.define_func(ScopeTree::ROOT, func_def)?,
            }
        }
        Ok(())
    }
}

/// Resolves every name use against the built tree.
struct ScopeChecker<'tree> {
    tree: &'tree ScopeTree,
    current: ScopeId,
}

impl ScopeChecker<'_> {
    fn check_resolves(&self, ident: Ident) -> Result<()> {
        if self.tree.resolve(self.current, ident.name).is_none() {
            return Err(ident.span.wrap(Error::IdentifierUndefined(ident.name)));
        }
        Ok(())
    }

    fn check_local(&self, ident: Ident) -> Result<()> {
        if !self.tree.contains(self.current, ident.name) {
            return Err(ident.span.wrap(Error::AssignTargetOutOfScope(ident.name)));
        }
        Ok(())
    }
}

impl Visitor for ScopeChecker<'_> {
    type Err = Spanned<Error>;

    fn visit_func_def(&mut self, el: &FuncDef) -> Result<()> {
        // SAFETY: The builder defined every function of this scope.
        self.current = self.tree.func_scope(self.current, el.name.name).unwrap();
        Ok(())
    }

    fn leave_func_def(&mut self, _el: &FuncDef) -> Result<()> {
        self.current = self.tree.parent(self.current).unwrap_or(ScopeTree::ROOT);
        Ok(())
    }

    fn visit_declaration(&mut self, el: &Declaration) -> Result<()> {
        match el {
            Declaration::Var(_) => Ok(()),
            Declaration::Global(ident) => {
                if self.tree.global_scope_contains(ident.name) {
                    Ok(())
                } else {
                    Err(ident.span.wrap(Error::IdentifierNotInGlobalScope(ident.name)))
                }
            }
            Declaration::NonLocal(ident) => {
                if self.tree.parent_scope_contains(self.current, ident.name) {
                    Ok(())
                } else {
                    Err(ident.span.wrap(Error::IdentifierNotInParentScope(ident.name)))
                }
            }
        }
    }

    fn visit_stmt(&mut self, el: &Stmt) -> Result<()> {
        match &el.kind {
            StmtKind::For { target, .. } => self.check_local(*target),
            StmtKind::Assign { targets, value: _ } => {
                for target in targets {
                    if let ExprKind::Ident(ident) = target.kind {
                        self.check_local(ident)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn visit_expr(&mut self, el: &Expr) -> Result<()> {
        match &el.kind {
            ExprKind::Ident(ident) => self.check_resolves(*ident),
            ExprKind::Call { func, args: _ } => self.check_resolves(*func),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    IdentifierAlreadyDefined(Symbol),
    IdentifierUndefined(Symbol),
    AssignTargetOutOfScope(Symbol),
    IdentifierNotInParentScope(Symbol),
    IdentifierNotInGlobalScope(Symbol),
    AssignTargetInvalid,
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use scope;

        fn test_valid_program() {
            let program = indoc::indoc! {"
                x: int = 0
                def f(a: int) -> int:
                    global x
                    y: int = 1
                    x = a + y
                    return x
                for x in [1, 2]:
                    print(f(x))
            "};
            let expected_errors = &[];
        }

        fn test_assign_to_undefined_chain() {
            let program = "a = b = 1\n";
            let expected_errors = &["0..1: cannot assign to a, which is not defined in this scope"];
        }

        fn test_assign_to_global_without_declaration() {
            let program = "x: int = 0\ndef f():\n    x = 1\nf()\n";
            let expected_errors = &["24..25: cannot assign to x, which is not defined in this scope"];
        }

        fn test_for_target_must_be_local() {
            let program = "def f():\n    for i in [1]:\n        pass\nf()\n";
            let expected_errors = &["17..18: cannot assign to i, which is not defined in this scope"];
        }

        fn test_undefined_identifier() {
            let program = "print(y)\n";
            let expected_errors = &["6..7: identifier y is not defined"];
        }

        fn test_undefined_function() {
            let program = "g(1)\n";
            let expected_errors = &["0..1: identifier g is not defined"];
        }

        fn test_duplicate_definition() {
            let program = "x: int = 0\nx: bool = True\n";
            let expected_errors = &["11..12: identifier x is already defined"];
        }

        fn test_duplicate_param() {
            let program = "def f(a: int, a: int):\n    pass\n";
            let expected_errors = &["14..15: identifier a is already defined"];
        }

        fn test_builtin_redefinition() {
            let program = "print: int = 1\n";
            let expected_errors = &["0..5: identifier print is already defined"];
        }

        fn test_global_not_in_global_scope() {
            let program = "def f():\n    global z\n    pass\n";
            let expected_errors = &["20..21: identifier z is not defined in the global scope"];
        }

        fn test_nonlocal_without_enclosing_function() {
            let program = "x: int = 0\ndef f():\n    nonlocal x\n    pass\n";
            let expected_errors = &["33..34: identifier x is not defined in an enclosing function scope"];
        }

        fn test_invalid_assign_target() {
            let program = "x: int = 0\nx + 1 = 2\n";
            let expected_errors = &["11..16: cannot assign to this expression"];
        }
    );

    #[test]
    fn test_scope_tree_lookup() {
        use super::*;
        use crate::parser::test_utils::parse_program;

        let (mut i, program) = parse_program("x: int = 0\ndef f(a: int):\n    y: int = 1\n    pass\n");
        let tree = check(&program).unwrap();
        let (x, f, a, y) = (i.intern("x"), i.intern("f"), i.intern("a"), i.intern("y"));

        let inner = tree.func_scope(ScopeTree::ROOT, f).unwrap();
        assert_eq!(tree.parent(inner), Some(ScopeTree::ROOT));
        assert!(tree.contains(inner, a));
        assert!(tree.contains(inner, y));
        assert!(!tree.contains(inner, x));
        assert_eq!(tree.resolve(inner, x), Some(Binding::Var));
        assert_eq!(tree.resolve(inner, well_known::PRINT), Some(Binding::Builtin));
        assert_eq!(tree.resolve(ScopeTree::ROOT, y), None);
        assert!(tree.global_scope_contains(x));
        assert!(!tree.parent_scope_contains(inner, x));
    }
}
