//! Disambiguation by label similarity.
//!
//! Candidates are scored with a Tversky index over word tokens:
//!
//! ```text
//!                    α·|A∩B|
//!   S(A, B) = ─────────────────────────────────
//!             α·|A∩B| + β·|A−B| + γ·|B−A|
//! ```
//!
//! where `A` is the candidate's description signature, `B` the entity label,
//! and the intersection is fuzzy: each token of `A` contributes the best
//! normalized Levenshtein similarity it reaches against `B`, when that
//! similarity is at least [`TverskyRanker::fuzzy_threshold`]. With the
//! default `β = γ` the measure is symmetric.

use conceptlink_terminology::{ConceptDescription, Language, TerminologySource};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// All descriptions of one concept, merged into one signature.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTerm {
    pub cui: String,
    pub descriptions: Vec<String>,
}

impl CandidateTerm {
    pub fn new(cui: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            cui: cui.into(),
            descriptions: vec![description.into()],
        }
    }

    /// Group descriptions by concept, keeping the order in which concepts first appear.
    pub fn group(descriptions: impl IntoIterator<Item = ConceptDescription>) -> Vec<CandidateTerm> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut terms: Vec<CandidateTerm> = Vec::new();
        for ConceptDescription { cui, description } in descriptions {
            match index.get(&cui) {
                Some(&i) => terms[i].descriptions.push(description),
                None => {
                    index.insert(cui.clone(), terms.len());
                    terms.push(CandidateTerm::new(cui, description));
                }
            }
        }
        terms
    }

    /// Space-joined text of every description.
    pub fn signature(&self) -> String {
        self.descriptions.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub term: CandidateTerm,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TverskyRanker {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    /// Minimum token similarity counted as a (partial) match.
    pub fuzzy_threshold: f64,
}

impl Default for TverskyRanker {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 0.5,
            gamma: 0.5,
            fuzzy_threshold: 0.8,
        }
    }
}

impl TverskyRanker {
    /// Similarity of `candidate` to `label`, in `[0, 1]`.
    pub fn score(&self, candidate: &str, label: &str) -> f64 {
        let a = tokens(candidate);
        let b = tokens(label);
        self.score_tokens(&a, &b)
    }

    fn score_tokens(&self, a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
        let common = self.fuzzy_overlap(a, b);
        let only_a = (a.len() as f64 - common).max(0.0);
        let only_b = (b.len() as f64 - common).max(0.0);

        let numerator = self.alpha * common;
        let denominator = numerator + self.beta * only_a + self.gamma * only_b;
        if denominator <= 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }

    fn fuzzy_overlap(&self, a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
        let sum: f64 = a
            .iter()
            .map(|ta| {
                b.iter()
                    .map(|tb| strsim::normalized_levenshtein(ta, tb))
                    .fold(0.0_f64, f64::max)
            })
            .filter(|&similarity| similarity >= self.fuzzy_threshold)
            .sum();
        sum.min(a.len().min(b.len()) as f64)
    }

    /// Score every candidate against `label`; best first, ties in input order.
    pub fn rank(&self, label: &str, candidates: Vec<CandidateTerm>) -> Vec<RankedCandidate> {
        let label_tokens = tokens(label);
        let mut ranked: Vec<RankedCandidate> = candidates
            .into_par_iter()
            .map(|term| {
                let score = self.score_tokens(&tokens(&term.signature()), &label_tokens);
                RankedCandidate { term, score }
            })
            .collect();
        ranked.sort_by(|x, y| y.score.total_cmp(&x.score));
        ranked
    }

    /// Best-ranked concept for `label` among `cuis`, or among the whole
    /// terminology for `language` when `cuis` is `None`.
    pub fn best_concept(
        &self,
        terminology: &dyn TerminologySource,
        language: Language,
        cuis: Option<&BTreeSet<String>>,
        label: &str,
    ) -> conceptlink_terminology::Result<Option<String>> {
        let descriptions = terminology.concept_descriptions(language, cuis)?;
        let candidates = CandidateTerm::group(descriptions);
        tracing::debug!(candidates = candidates.len(), label, "ranking candidate concepts");
        Ok(self
            .rank(label, candidates)
            .into_iter()
            .next()
            .map(|best| best.term.cui))
    }
}

/// Lowercased alphanumeric word tokens, deduplicated.
fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn terms(descriptions: &[&str]) -> Vec<CandidateTerm> {
        descriptions
            .iter()
            .enumerate()
            .map(|(i, d)| CandidateTerm::new(format!("C{i:07}"), *d))
            .collect()
    }

    #[test]
    fn overlapping_description_ranks_first() {
        let ranker = TverskyRanker::default();
        let ranked = ranker.rank("diabetes", terms(&["flu", "diabetes mellitus"]));
        assert_eq!(ranked[0].term.descriptions, vec!["diabetes mellitus"]);
        assert!((ranked[0].score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(ranked[1].score, 0.0);
    }

    #[test]
    fn no_overlap_keeps_input_order() {
        let ranker = TverskyRanker::default();
        let ranked = ranker.rank("zzz", terms(&["flu", "diabetes mellitus", "asthma"]));
        let cuis: Vec<_> = ranked.iter().map(|r| r.term.cui.as_str()).collect();
        assert_eq!(cuis, vec!["C0000000", "C0000001", "C0000002"]);
        assert!(ranked.iter().all(|r| r.score == 0.0));
    }

    #[test]
    fn empty_candidates_rank_to_nothing() {
        assert!(TverskyRanker::default().rank("diabetes", Vec::new()).is_empty());
    }

    #[test]
    fn matching_is_case_insensitive_and_fuzzy() {
        let ranker = TverskyRanker::default();
        assert!((ranker.score("Diabète Sucré", "diabète sucré") - 1.0).abs() < 1e-9);
        assert!(ranker.score("diabetes", "diabetis") > 0.8);
        assert_eq!(ranker.score("", ""), 0.0);
    }

    #[test]
    fn descriptions_are_grouped_per_concept() {
        let grouped = CandidateTerm::group(vec![
            ConceptDescription::new("C2", "grippe"),
            ConceptDescription::new("C1", "diabète"),
            ConceptDescription::new("C2", "influenza"),
        ]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].cui, "C2");
        assert_eq!(grouped[0].signature(), "grippe influenza");
        assert_eq!(grouped[1].cui, "C1");
    }

    proptest! {
        #[test]
        fn ranking_is_a_stable_descending_permutation(
            descriptions in prop::collection::vec("[a-d]{1,3}( [a-d]{1,3}){0,2}", 0..12),
            label in "[a-d]{1,3}( [a-d]{1,3}){0,2}",
        ) {
            let ranker = TverskyRanker::default();
            let input = terms(&descriptions.iter().map(String::as_str).collect::<Vec<_>>());
            let ranked = ranker.rank(&label, input.clone());

            prop_assert_eq!(ranked.len(), input.len());
            let mut seen: Vec<_> = ranked.iter().map(|r| r.term.cui.clone()).collect();
            seen.sort();
            let mut expected: Vec<_> = input.iter().map(|t| t.cui.clone()).collect();
            expected.sort();
            prop_assert_eq!(seen, expected);

            for pair in ranked.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].term.cui < pair[1].term.cui);
                }
            }
        }
    }
}
