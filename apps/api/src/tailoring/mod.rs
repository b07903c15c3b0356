// Fact-constrained tailoring engine.
// Flow: keyword_extractor → matcher → rewriter → integrity → report / resume.
// Every stage is a pure function of the posting, the inventory and the ruleset.

pub mod handlers;
pub mod integrity;
pub mod keyword_extractor;
pub mod matcher;
pub mod pipeline;
pub mod report;
pub mod resume;
pub mod rewriter;
pub mod ruleset;
pub mod similarity;
pub mod text;
