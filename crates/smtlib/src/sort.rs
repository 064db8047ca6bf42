/// SMT-LIB sort (type) representation.
///
/// Horn encodings only need booleans, mathematical integers and arrays:
/// every fixed-width integer is an `Int` constrained to its range, and
/// mappings and dynamic arrays become `Array` sorts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sort {
    /// Boolean sort
    Bool,
    /// Mathematical integer sort
    Int,
    /// Array sort: `(Array index_sort element_sort)`
    Array(Box<Sort>, Box<Sort>),
}

impl Sort {
    /// Shorthand for `(Array index element)`.
    pub fn array(index: Sort, element: Sort) -> Self {
        Sort::Array(Box::new(index), Box::new(element))
    }
}
