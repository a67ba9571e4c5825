//! Building blocks of the viewer statistics query: which rows participate
//! (`predicate`) and how aggregated viewers are ordered (`sort`).

pub mod predicate;
pub mod sort;

pub use predicate::{Column, ColumnSource, FilterSet, Predicate, PredicateSet};
pub use sort::{SortColumn, SortDirection, SortKey, SortOrder, SortValue};
