//! One posting in, one report and resume out.
//!
//! Each run owns all of its intermediate state; the ruleset and inventory are
//! only read, so batches fan out across postings with rayon.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::models::inventory::Inventory;
use crate::tailoring::integrity::IntegrityChecker;
use crate::tailoring::keyword_extractor::{extract_requirements, RequirementPhrase};
use crate::tailoring::matcher::{ExperienceMatcher, MatchResult};
use crate::tailoring::report::AnalysisReport;
use crate::tailoring::resume::{self, ResumeLine};
use crate::tailoring::rewriter::{ConstrainedRewriter, RewriteCandidate};
use crate::tailoring::ruleset::Ruleset;
use crate::tailoring::similarity::{DictionarySimilarity, SimilarityStrategy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub resume_lines: Vec<ResumeLine>,
    pub resume_text: String,
    pub report: AnalysisReport,
}

#[derive(Clone)]
pub struct Analyzer {
    ruleset: Arc<Ruleset>,
    similarity: Arc<dyn SimilarityStrategy>,
}

impl Analyzer {
    pub fn new(ruleset: Arc<Ruleset>, similarity: Arc<dyn SimilarityStrategy>) -> Self {
        Self {
            ruleset,
            similarity,
        }
    }

    pub fn with_dictionary(ruleset: Arc<Ruleset>) -> Self {
        let similarity = Arc::new(DictionarySimilarity::new(ruleset.clone()));
        Self::new(ruleset, similarity)
    }

    pub fn extract(&self, posting_text: &str) -> Vec<RequirementPhrase> {
        extract_requirements(posting_text, &self.ruleset)
    }

    pub fn analyze(&self, posting_text: &str, inventory: &Inventory) -> Analysis {
        let requirements = self.extract(posting_text);
        let results = ExperienceMatcher::new(self.ruleset.clone(), self.similarity.clone())
            .match_requirements(&requirements, inventory);

        let rewriter = ConstrainedRewriter::new(self.ruleset.clone());
        let candidates: Vec<RewriteCandidate> = results
            .iter()
            .flat_map(|result| rewriter.propose(result, inventory))
            .collect();

        self.finish(&results, candidates, inventory)
    }

    /// Postings are independent runs; output keeps input order.
    pub fn analyze_batch(&self, postings: &[String], inventory: &Inventory) -> Vec<Analysis> {
        postings
            .par_iter()
            .map(|posting| self.analyze(posting, inventory))
            .collect()
    }

    /// Gates every candidate through the integrity checker, then builds the
    /// report and resume from the verdicts.
    pub(crate) fn finish(
        &self,
        results: &[MatchResult],
        candidates: Vec<RewriteCandidate>,
        inventory: &Inventory,
    ) -> Analysis {
        let verdicts = IntegrityChecker::new(self.ruleset.clone()).check_all(candidates, inventory);
        let report = AnalysisReport::build(results, &verdicts, inventory);
        let resume_lines = resume::assemble(inventory, results, &verdicts);
        let resume_text = resume::render(&resume_lines);

        info!(
            requirements = report.requirement_count,
            matched = report.matched.len(),
            partial = report.partial.len(),
            unmatched = report.unmatched.len(),
            accepted = report.accepted_count(),
            rejected = report.rejected.len(),
            match_rate = report.match_rate,
            "Analysis complete"
        );

        Analysis {
            resume_lines,
            resume_text,
            report,
        }
    }
}
