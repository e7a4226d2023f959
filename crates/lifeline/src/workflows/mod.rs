pub mod emergency;
pub mod matching;
pub mod monitor;
pub mod outreach;
pub mod registry;
pub(crate) mod responses;
pub mod validation;

#[cfg(test)]
pub(crate) mod fixtures;
