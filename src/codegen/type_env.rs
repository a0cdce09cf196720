//! Maps value types to IR types, naming each distinct list shape.

use std::{convert::Infallible, rc::Rc};

use log::trace;

use crate::{
    ast::{Expr, FuncDef, Program, VarDef},
    codegen::ir::{Module, Ty},
    type_checker::TypeHints,
    types::ValueType,
    visit::Visitor,
};

/// Opaque structs standing for values without a layout of their own.
pub const OPAQUE: [&str; 4] = ["object", "none", "empty", "list_content"];

/// A list struct, `{ content: elem*, size: i32, init: i1 }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListShape {
    pub name: Rc<str>,
    pub elem: Ty,
}

impl ListShape {
    pub const CONTENT: i32 = 0;
    pub const SIZE: i32 = 1;
    pub const INIT: i32 = 2;

    pub fn ty(&self) -> Ty {
        Ty::Named(self.name.clone())
    }

    pub fn ptr_ty(&self) -> Ty {
        Ty::ptr(self.ty())
    }

    pub fn fields(&self) -> Vec<Ty> {
        vec![Ty::ptr(self.elem.clone()), Ty::I32, Ty::I1]
    }

    /// Name of a per-shape helper, e.g. `list0_len`.
    pub fn helper(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.name)
    }
}

#[derive(Debug, Default)]
pub struct TypeEnv {
    shapes: Vec<ListShape>,
}

impl TypeEnv {
    /// Collects the list shapes named by annotations and type hints of
    /// `program`.
    pub fn build(program: &Program, hints: &TypeHints) -> TypeEnv {
        let mut collector = Collector {
            env: TypeEnv::default(),
            hints,
        };
        match collector.walk_program(program) {
            Ok(()) => {}
            Err(infallible) => match infallible {},
        }
        collector.env
    }

    pub fn shapes(&self) -> &[ListShape] {
        &self.shapes
    }

    /// The IR type values of `ty` have. Unseen list shapes are interned.
    pub fn ty(&mut self, ty: &ValueType) -> Ty {
        match ty {
            ValueType::Int => Ty::I32,
            ValueType::Bool => Ty::I1,
            ValueType::Str => Ty::ptr(Ty::I8),
            ValueType::None => Ty::ptr(Ty::named("none")),
            ValueType::Empty => Ty::ptr(Ty::named("empty")),
            ValueType::Object | ValueType::Bottom => Ty::ptr(Ty::named("object")),
            ValueType::List(elem) => self.shape(elem).ptr_ty(),
        }
    }

    /// The shape of lists whose elements have type `elem`.
    pub fn shape(&mut self, elem: &ValueType) -> ListShape {
        let elem = self.ty(elem);
        self.intern(elem)
    }

    /// The shape `[]` is built with.
    pub fn empty_shape(&mut self) -> ListShape {
        self.shape(&ValueType::Object)
    }

    fn intern(&mut self, elem: Ty) -> ListShape {
        let fields = vec![Ty::ptr(elem.clone()), Ty::I32, Ty::I1];
        if let Some(shape) = self.shapes.iter().find(|shape| shape.fields() == fields) {
            return shape.clone();
        }
        let shape = ListShape {
            name: format!("list{}", self.shapes.len()).into(),
            elem,
        };
        trace!("interned list shape {} of {}", shape.name, shape.elem);
        self.shapes.push(shape.clone());
        shape
    }

    /// Adds the opaque structs and every list struct to `module`.
    pub fn define_types(&self, module: &mut Module) {
        for name in OPAQUE {
            module.add_type(name, None);
        }
        for shape in &self.shapes {
            module.add_type(&shape.name, Some(shape.fields()));
        }
    }
}

struct Collector<'h> {
    env: TypeEnv,
    hints: &'h TypeHints,
}

impl Visitor for Collector<'_> {
    type Err = Infallible;

    fn visit_var_def(&mut self, el: &VarDef) -> Result<(), Infallible> {
        self.env.ty(&ValueType::from_annotation(&el.var.ty));
        Ok(())
    }

    fn visit_func_def(&mut self, el: &FuncDef) -> Result<(), Infallible> {
        for param in &el.params {
            self.env.ty(&ValueType::from_annotation(&param.ty));
        }
        if let Some(ret) = &el.return_ty {
            self.env.ty(&ValueType::from_annotation(ret));
        }
        Ok(())
    }

    fn visit_expr(&mut self, el: &Expr) -> Result<(), Infallible> {
        match self.hints.get(el.id) {
            Some(ValueType::Empty) => {
                self.env.empty_shape();
            }
            Some(ty) => {
                self.env.ty(ty);
            }
            None => {}
        }
        Ok(())
    }
}
