use std::collections::HashMap;

use regex::Regex;

use crate::{corpus::EvidenceChunk, types::ScenarioTag};

// BM25 Okapi constants.
const BM25_K1: f64 = 1.5;
const BM25_B: f64 = 0.75;

/// Ordered guidance-domain preference per scenario tag. A binary partition
/// key at re-rank time, not a full domain ranking.
pub fn domain_preference(tag: ScenarioTag) -> &'static [&'static str] {
    match tag {
        ScenarioTag::Generic => &["sphere", "ics", "who", "fema", "ifrc"],
        ScenarioTag::Wash => &["sphere", "who", "ifrc", "ics", "fema"],
        ScenarioTag::Heat => &["who", "sphere", "ifrc", "ics", "fema"],
        ScenarioTag::Protection => &["ifrc", "who", "sphere", "ics", "fema"],
    }
}

/// Immutable lexical index over the guidance corpus. Built once, then only
/// read; safe to share across requests without synchronization.
pub struct Retriever {
    chunks: Vec<EvidenceChunk>,
    doc_terms: Vec<HashMap<String, usize>>,
    doc_len: Vec<usize>,
    doc_freq: HashMap<String, usize>,
    avg_len: f64,
    token_re: Regex,
}

impl Retriever {
    pub fn new(chunks: Vec<EvidenceChunk>) -> Self {
        let token_re = Regex::new(r"[a-z0-9]+").expect("static regex");

        let mut doc_terms = Vec::with_capacity(chunks.len());
        let mut doc_len = Vec::with_capacity(chunks.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for chunk in &chunks {
            let tokens = tokenize(&token_re, &chunk.body);
            let mut counts: HashMap<String, usize> = HashMap::new();
            for token in &tokens {
                *counts.entry(token.clone()).or_insert(0) += 1;
            }
            for term in counts.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            doc_len.push(tokens.len());
            doc_terms.push(counts);
        }

        let avg_len = if doc_len.is_empty() {
            0.0
        } else {
            doc_len.iter().sum::<usize>() as f64 / doc_len.len() as f64
        };

        Self {
            chunks,
            doc_terms,
            doc_len,
            doc_freq,
            avg_len,
            token_re,
        }
    }

    /// Top-k chunks for `query`: rank everything by BM25, over-fetch the top
    /// `2k` by relevance, then stable-partition that shortlist so preferred
    /// domains come first (prior relevance order kept within each half), and
    /// truncate to `k`. Deterministic for identical corpus and query; an
    /// empty query scores everything zero and yields the first `k` chunks in
    /// index order.
    pub fn topk(&self, query: &str, k: usize, prefer: &[&str]) -> Vec<&EvidenceChunk> {
        if k == 0 || self.chunks.is_empty() {
            return Vec::new();
        }

        let scores = self.score_all(query);
        let mut order: Vec<usize> = (0..self.chunks.len()).collect();
        // Stable sort: equal scores keep index order.
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order.truncate(k * 2);

        order.sort_by_key(|&i| {
            if prefer.contains(&self.chunks[i].domain.as_str()) {
                0
            } else {
                1
            }
        });
        order.truncate(k);

        order.into_iter().map(|i| &self.chunks[i]).collect()
    }

    fn score_all(&self, query: &str) -> Vec<f64> {
        let terms = tokenize(&self.token_re, query);
        let n = self.chunks.len() as f64;

        let mut scores = vec![0.0; self.chunks.len()];
        for term in &terms {
            let Some(&df) = self.doc_freq.get(term) else {
                continue;
            };
            let idf = ((n - df as f64 + 0.5) / (df as f64 + 0.5) + 1.0).ln();
            for (i, counts) in self.doc_terms.iter().enumerate() {
                let Some(&tf) = counts.get(term) else {
                    continue;
                };
                let tf = tf as f64;
                let norm = 1.0 - BM25_B + BM25_B * self.doc_len[i] as f64 / self.avg_len.max(1.0);
                scores[i] += idf * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * norm);
            }
        }
        scores
    }

    /// Evidence blurbs formatted for the prompt: `[DOMAIN | title | id] body`.
    pub fn blurbs(recs: &[&EvidenceChunk]) -> String {
        recs.iter()
            .map(|r| format!("[{} | {} | {}] {}", r.domain.to_uppercase(), r.title, r.id, r.body))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn cite_ids(recs: &[&EvidenceChunk]) -> Vec<String> {
        recs.iter().map(|r| r.cite_id()).collect()
    }
}

fn tokenize(re: &Regex, text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    re.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}
