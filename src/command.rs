pub(crate) mod build;
pub(crate) mod convert;
pub(crate) mod info;
pub(crate) mod lookup;
