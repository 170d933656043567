/// Static node graph per diagram variant.
pub mod layout;
