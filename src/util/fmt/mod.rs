use std::fmt;

use crate::util::intern::Interner;

pub mod error;
pub mod tree;

/// What diagnostics need besides themselves to be rendered: errors only hold
/// interned [`Symbol`](crate::util::intern::Symbol)s.
#[derive(Copy, Clone)]
pub struct Context<'ident> {
    pub ident_interner: &'ident Interner,
}

impl<'ident> Context<'ident> {
    pub fn new(ident_interner: &'ident Interner) -> Context<'ident> {
        Context { ident_interner }
    }

    /// Renders `item`; the alternate form prefixes errors with their span.
    pub fn render<T: Show>(self, item: &T, with_span: bool) -> String {
        if with_span {
            format!("{:#}", item.display(&self))
        } else {
            item.display(&self).to_string()
        }
    }
}

/// [`fmt::Display`] for values that reference interned names.
pub trait Show {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result;

    fn display<'a>(&'a self, ctx: &'a Context<'_>) -> impl fmt::Display + 'a
    where
        Self: Sized,
    {
        Shown { item: self, ctx }
    }
}

struct Shown<'a, 'ident, T> {
    item: &'a T,
    ctx: &'a Context<'ident>,
}

impl<T: Show> fmt::Display for Shown<'_, '_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.item.show(f, self.ctx)
    }
}
