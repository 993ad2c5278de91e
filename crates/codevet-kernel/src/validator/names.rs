//! Name tracking for the undefined-name and unused-binding heuristics.
//!
//! Deliberately flat: one set of bound names for the whole module, with
//! no frames for functions, classes or comprehensions. A name bound
//! anywhere earlier in the walk counts as bound everywhere after it.

use std::collections::HashSet;

/// Names every module can read without binding them.
pub const BUILTINS: &[&str] = &[
    // Constants and module attributes
    "True", "False", "None", "Ellipsis", "NotImplemented", "__debug__",
    "__name__", "__file__", "__doc__", "__package__", "__loader__", "__spec__",
    "__annotations__", "__cached__", "__builtins__", "__import__",
    // Conventional receivers
    "self", "cls",
    // Functions
    "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool", "breakpoint",
    "bytearray", "bytes", "callable", "chr", "classmethod", "compile", "complex",
    "copyright", "credits", "delattr", "dict", "dir", "divmod", "enumerate", "eval",
    "exec", "exit", "filter", "float", "format", "frozenset", "getattr", "globals",
    "hasattr", "hash", "help", "hex", "id", "input", "int", "isinstance",
    "issubclass", "iter", "len", "license", "list", "locals", "map", "max",
    "memoryview", "min", "next", "object", "oct", "open", "ord", "pow", "print",
    "property", "quit", "range", "repr", "reversed", "round", "set", "setattr",
    "slice", "sorted", "staticmethod", "str", "sum", "super", "tuple", "type",
    "vars", "zip",
    // Exceptions
    "BaseException", "BaseExceptionGroup", "Exception", "ExceptionGroup",
    "ArithmeticError", "AssertionError", "AttributeError", "BlockingIOError",
    "BrokenPipeError", "BufferError", "ChildProcessError", "ConnectionError",
    "ConnectionAbortedError", "ConnectionRefusedError", "ConnectionResetError",
    "EOFError", "EnvironmentError", "FileExistsError", "FileNotFoundError",
    "FloatingPointError", "GeneratorExit", "IOError", "ImportError",
    "IndentationError", "IndexError", "InterruptedError", "IsADirectoryError",
    "KeyError", "KeyboardInterrupt", "LookupError", "MemoryError",
    "ModuleNotFoundError", "NameError", "NotADirectoryError", "NotImplementedError",
    "OSError", "OverflowError", "PermissionError", "ProcessLookupError",
    "RecursionError", "ReferenceError", "RuntimeError", "StopAsyncIteration",
    "StopIteration", "SyntaxError", "SystemError", "SystemExit", "TabError",
    "TimeoutError", "TypeError", "UnboundLocalError", "UnicodeDecodeError",
    "UnicodeEncodeError", "UnicodeError", "UnicodeTranslateError", "ValueError",
    "ZeroDivisionError",
    // Warnings
    "Warning", "BytesWarning", "DeprecationWarning", "EncodingWarning",
    "FutureWarning", "ImportWarning", "PendingDeprecationWarning",
    "ResourceWarning", "RuntimeWarning", "SyntaxWarning", "UnicodeWarning",
    "UserWarning",
    // Typing names generated code tends to use without importing
    "Union", "Optional", "List", "Dict", "Tuple", "Set", "FrozenSet", "Type",
    "Callable", "Any", "TypeVar", "Generic", "Protocol", "Literal", "Final",
    "TypedDict", "NotRequired", "Required", "Annotated", "TypeAlias", "ParamSpec",
    "TypeVarTuple", "Unpack", "Self", "Never", "assert_type", "assert_never",
    "reveal_type",
];

/// Builtins most often misspelled in generated code.
const TYPO_CANDIDATES: &[&str] = &[
    "print", "len", "range", "str", "int", "float", "list", "dict", "open", "input",
];

/// Flat set of bound names.
pub struct NameTable {
    bound: HashSet<String>,
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NameTable {
    /// A table with the builtins already bound.
    pub fn new() -> Self {
        let mut table = Self {
            bound: HashSet::new(),
        };
        for name in BUILTINS {
            table.bind(*name);
        }
        table
    }

    pub fn bind(&mut self, name: impl Into<String>) {
        self.bound.insert(name.into());
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bound.contains(name)
    }

    /// Leading underscore marks a binding as intentionally unused.
    pub fn is_intentionally_unused(name: &str) -> bool {
        name.starts_with('_')
    }
}

/// Builtins `name` looks like a typo of.
pub fn typo_candidates(name: &str) -> impl Iterator<Item = &'static str> + '_ {
    TYPO_CANDIDATES
        .iter()
        .copied()
        .filter(move |candidate| is_similar(name, candidate))
}

// Same length, at most one differing character.
fn is_similar(a: &str, b: &str) -> bool {
    if a.chars().count() != b.chars().count() {
        return false;
    }
    a.chars().zip(b.chars()).filter(|(x, y)| x != y).count() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_builtins() {
        let table = NameTable::new();
        assert!(table.is_bound("print"));
        assert!(table.is_bound("ValueError"));
        assert!(table.is_bound("self"));
        assert!(table.is_bound("Optional"));
        assert!(!table.is_bound("requests"));
    }

    #[test]
    fn bind_and_lookup() {
        let mut table = NameTable::new();
        assert!(!table.is_bound("total"));
        table.bind("total");
        assert!(table.is_bound("total"));
    }

    #[test]
    fn underscore_convention() {
        assert!(NameTable::is_intentionally_unused("_"));
        assert!(NameTable::is_intentionally_unused("_unused"));
        assert!(!NameTable::is_intentionally_unused("value"));
    }

    #[test]
    fn typos() {
        assert_eq!(typo_candidates("prnt").count(), 0);
        assert_eq!(typo_candidates("pront").collect::<Vec<_>>(), ["print"]);
        assert_eq!(typo_candidates("lan").collect::<Vec<_>>(), ["len"]);
        assert_eq!(typo_candidates("print").collect::<Vec<_>>(), ["print"]);
        assert_eq!(typo_candidates("totally").count(), 0);
    }
}
