pub(crate) mod aggregator;
pub(crate) mod callback;
pub(crate) mod providers;
