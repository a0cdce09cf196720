use std::{collections::HashMap, fmt, num::NonZeroU32, rc::Rc};

/// A handle to an interned identifier. To retrieve the `&str`, use
/// [`Interner::get`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    // A NonZeroU32 keeps `Option<Symbol>` the same size as `Symbol`.
    handle: NonZeroU32,
}

impl Symbol {
    pub(crate) const fn unchecked_new(handle: u32) -> Symbol {
        match NonZeroU32::new(handle) {
            Some(handle) => Symbol { handle },
            None => panic!("symbol handles start at one"),
        }
    }

    fn index(self) -> usize {
        (self.handle.get() - 1) as usize
    }
}

impl From<&Symbol> for Symbol {
    fn from(symbol: &Symbol) -> Symbol {
        *symbol
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.handle)
    }
}

/// Names which are known before any source is seen. Their handles are fixed,
/// since [`Interner::new`] interns them first and in this order.
pub mod well_known {
    use super::Symbol;

    pub const PRINT: Symbol = Symbol::unchecked_new(1);
    pub const LEN: Symbol = Symbol::unchecked_new(2);
    pub const INPUT: Symbol = Symbol::unchecked_new(3);

    pub const ALL: &[(Symbol, &str)] = &[(PRINT, "print"), (LEN, "len"), (INPUT, "input")];

    /// The builtin functions, which live in the global scope.
    pub const BUILTINS: &[Symbol] = &[PRINT, LEN, INPUT];
}

pub struct Interner {
    map: HashMap<Rc<str>, Symbol>,
    vec: Vec<Rc<str>>,
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (i, interned) in self.vec.iter().enumerate() {
            map.entry(&(i + 1), interned);
        }
        map.finish()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Interner::with_capacity(64)
    }
}

impl Interner {
    pub fn new() -> Interner {
        Interner::default()
    }

    /// Creates an interner with the [`well_known`] names already registered.
    pub fn with_capacity(capacity: usize) -> Interner {
        let mut interner = Interner {
            map: HashMap::with_capacity(capacity),
            vec: Vec::with_capacity(capacity),
        };
        for &(expected, name) in well_known::ALL {
            let symbol = interner.intern(name);
            assert_eq!(symbol, expected);
        }
        interner
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    /// Interns the provided name, returning a handle which can be used to
    /// retrieve it later.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(symbol) = self.map.get(name) {
            return *symbol;
        }
        let key: Rc<str> = Rc::from(name);
        let handle = u32::try_from(self.vec.len() + 1).expect("interned out of capacity");
        let symbol = Symbol::unchecked_new(handle);
        self.vec.push(Rc::clone(&key));
        self.map.insert(key, symbol);
        symbol
    }

    /// Returns the symbol for an already interned name, if any.
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.map.get(name).copied()
    }

    /// Returns the name for the provided [`Symbol`]. Panics if the symbol
    /// comes from another interner.
    pub fn get(&self, symbol: impl Into<Symbol>) -> &str {
        &self.vec[symbol.into().index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner() {
        let mut i = Interner::with_capacity(3);

        let hello1 = i.intern("hello");
        let world1 = i.intern("world");
        let hello2 = i.intern("hello");
        let world2 = i.intern("world");

        assert_eq!(hello1, hello2);
        assert_eq!(world1, world2);
        assert_ne!(hello1, world1);
        assert_eq!(i.get(hello1), "hello");
        assert_eq!(i.get(world2), "world");
        assert_eq!(i.lookup("hello"), Some(hello1));
        assert_eq!(i.lookup("nope"), None);
    }

    #[test]
    fn well_known_names_are_preinterned() {
        let mut i = Interner::new();
        assert_eq!(i.len(), well_known::ALL.len());
        assert_eq!(i.intern("print"), well_known::PRINT);
        assert_eq!(i.intern("len"), well_known::LEN);
        assert_eq!(i.intern("input"), well_known::INPUT);
        assert_eq!(i.get(well_known::INPUT), "input");
    }
}
