mod block_spec;
mod range_iterator;

pub use block_spec::{BlockSpec, resolve_range};
pub(crate) use block_spec::precheck_range;
pub use range_iterator::{
    ChunkDescriptor, ChunkPlanner, Forward, RangeIterator, Reverse, effective_floor,
};
