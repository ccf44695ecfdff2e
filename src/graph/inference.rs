//! Relationship Inference
//!
//! Independent strategies propose candidate edges from the registry; a
//! single writer ([`EdgeSet`]) commits them in a fixed strategy order so the
//! first writer wins deterministically. A strategy that fails is logged and
//! skipped; nothing a strategy commits is ever removed.

use super::registry::{EntityRegistry, Mention, SourceText};
use crate::domain::{EntityType, RelationLabel, RelationshipEdge};
use crate::extraction::normalize::slice;
use anyhow::Result;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

// =============================================================================
// Edge Set
// =============================================================================

/// Existing-edge check applied when a candidate is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Skip if an edge with the same label already joins the pair
    SameLabel,
    /// Skip if any edge already joins the pair
    AnyEdge,
    /// Skip if the same label exists in either direction
    NoReverse,
}

/// A proposed edge and the check that decides whether it is kept.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub edge: RelationshipEdge,
    pub guard: Guard,
}

impl Candidate {
    pub fn new(edge: RelationshipEdge, guard: Guard) -> Self {
        Self { edge, guard }
    }
}

/// Append-only edge log. At most one edge per `(source, target, label)`;
/// symmetric labels count both directions as the same edge.
#[derive(Debug, Default)]
pub struct EdgeSet {
    edges: Vec<RelationshipEdge>,
    keys: HashSet<(String, String, RelationLabel)>,
    pairs: HashSet<(String, String)>,
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `source -> target` with `label` is present.
    pub fn contains(&self, source: &str, target: &str, label: RelationLabel) -> bool {
        let forward = (source.to_string(), target.to_string(), label);
        if self.keys.contains(&forward) {
            return true;
        }
        label.is_symmetric() && self.keys.contains(&(target.to_string(), source.to_string(), label))
    }

    /// Whether any edge joins `a` and `b`.
    pub fn connected(&self, a: &str, b: &str) -> bool {
        let (x, y) = ordered(a, b);
        self.pairs.contains(&(x.to_string(), y.to_string()))
    }

    /// Commit an edge unconditionally unless it duplicates an existing one.
    pub fn insert(&mut self, edge: RelationshipEdge) -> bool {
        self.commit(Candidate::new(edge, Guard::SameLabel))
    }

    /// Apply a candidate. Returns whether it was written.
    pub fn commit(&mut self, candidate: Candidate) -> bool {
        let Candidate { edge, guard } = candidate;
        if edge.source == edge.target || self.contains(&edge.source, &edge.target, edge.label) {
            return false;
        }
        let rejected = match guard {
            Guard::SameLabel => false,
            Guard::AnyEdge => self.connected(&edge.source, &edge.target),
            Guard::NoReverse => self.contains(&edge.target, &edge.source, edge.label),
        };
        if rejected {
            return false;
        }

        let (x, y) = ordered(&edge.source, &edge.target);
        self.pairs.insert((x.to_string(), y.to_string()));
        self.keys
            .insert((edge.source.clone(), edge.target.clone(), edge.label));
        self.edges.push(edge);
        true
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationshipEdge> {
        self.edges.iter()
    }

    pub fn into_edges(self) -> Vec<RelationshipEdge> {
        self.edges
    }
}

// =============================================================================
// Type-pair Pattern Table
// =============================================================================

/// A labelled relation between two canonical tags.
#[derive(Debug, Clone, Copy)]
pub struct PairRule {
    pub source: &'static str,
    pub target: &'static str,
    pub label: RelationLabel,
    pub weight: f32,
    pub confidence: f32,
}

const fn pair(
    source: &'static str,
    target: &'static str,
    label: RelationLabel,
    weight: f32,
    confidence: f32,
) -> PairRule {
    PairRule {
        source,
        target,
        label,
        weight,
        confidence,
    }
}

/// Ordered `(source tag, target tag)` pairs with a known relation.
pub const PAIR_RULES: &[PairRule] = &[
    pair("JUDGE", "COURT", RelationLabel::PresidesIn, 0.8, 0.7),
    pair("CASE", "STATUTE", RelationLabel::Interprets, 0.7, 0.6),
    pair("PRECEDENT", "STATUTE", RelationLabel::Interprets, 0.7, 0.6),
    pair("CASE", "PRECEDENT", RelationLabel::Cites, 0.8, 0.6),
    pair("PETITIONER", "RESPONDENT", RelationLabel::Versus, 0.9, 0.8),
    pair("CASE", "PRINCIPLE", RelationLabel::Applies, 0.6, 0.5),
    pair("COURT", "PRINCIPLE", RelationLabel::Applies, 0.6, 0.5),
    pair("STATUTE", "PROVISION", RelationLabel::Contains, 0.7, 0.6),
    pair("CASE", "DATE", RelationLabel::Related, 0.5, 0.5),
    pair("PRECEDENT", "DATE", RelationLabel::Related, 0.5, 0.5),
];

/// Weight and confidence of the same-type fallback used by proximity.
const SAME_TYPE_WEIGHT: f32 = 0.3;
const SAME_TYPE_CONFIDENCE: f32 = 0.4;

/// Rule for the ordered pair, if any.
pub fn pair_rule(source_tag: &str, target_tag: &str) -> Option<&'static PairRule> {
    PAIR_RULES
        .iter()
        .find(|r| r.source == source_tag && r.target == target_tag)
}

// =============================================================================
// Strategy Interface
// =============================================================================

/// Read-only view shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct InferenceContext<'a> {
    pub registry: &'a EntityRegistry,
    /// Byte distance under which two mentions count as near
    pub proximity_threshold: usize,
}

impl InferenceContext<'_> {
    fn id(&self, node: usize) -> &str {
        &self.registry.node(node).id
    }

    fn tag(&self, node: usize) -> &str {
        self.registry.node(node).tag()
    }

    fn label(&self, node: usize) -> &str {
        &self.registry.node(node).label
    }

    /// Edge for a tagged pair via the table, tried in both orientations.
    fn table_edge(&self, a: usize, b: usize) -> Option<RelationshipEdge> {
        let (source, target, rule) = match pair_rule(self.tag(a), self.tag(b)) {
            Some(rule) => (a, b, rule),
            None => (b, a, pair_rule(self.tag(b), self.tag(a))?),
        };
        Some(
            RelationshipEdge::new(self.id(source), self.id(target), rule.label)
                .with_weight(rule.weight)
                .with_confidence(rule.confidence),
        )
    }
}

/// One relationship heuristic.
pub trait InferenceStrategy: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Propose candidates given the edges committed so far.
    fn propose(&self, ctx: &InferenceContext<'_>, edges: &EdgeSet) -> Result<Vec<Candidate>>;
}

/// The built-in strategies in commit order.
pub fn default_strategies() -> Vec<Box<dyn InferenceStrategy>> {
    vec![
        Box::new(ProximityStrategy),
        Box::new(SectionStrategy),
        Box::new(SemanticStrategy),
        Box::new(StructuralStrategy),
        Box::new(CitationNetworkStrategy),
        Box::new(PrecedentChainStrategy),
    ]
}

/// Run strategies in order, committing each one's candidates before the next
/// proposes. Returns the number of edges added.
pub fn run_strategies(
    strategies: &[Box<dyn InferenceStrategy>],
    ctx: &InferenceContext<'_>,
    edges: &mut EdgeSet,
) -> usize {
    let before = edges.len();
    for strategy in strategies {
        let candidates = match strategy.propose(ctx, edges) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(strategy = strategy.name(), error = %e, "Inference strategy failed, skipping");
                continue;
            }
        };
        let proposed = candidates.len();
        let committed = candidates
            .into_iter()
            .map(|c| edges.commit(c))
            .filter(|&written| written)
            .count();
        tracing::debug!(strategy = strategy.name(), proposed, committed, "Inference pass complete");
    }
    edges.len() - before
}

/// Pairs of distinct-node mentions in offset order. `in_reach` must be
/// monotone in `b.start`: the inner scan stops at the first `b` out of reach.
fn pairs_within<'a, F>(mentions: &'a [Mention], in_reach: F) -> impl Iterator<Item = (Mention, Mention)> + 'a
where
    F: Fn(&Mention, &Mention) -> bool + Copy + 'a,
{
    mentions.iter().enumerate().flat_map(move |(i, a)| {
        mentions[i + 1..]
            .iter()
            .take_while(move |b| in_reach(a, *b))
            .filter(move |b| b.node != a.node)
            .map(move |b| (*a, *b))
    })
}

// =============================================================================
// 1. Proximity
// =============================================================================

/// Mentions starting within the threshold of each other in the same source.
#[derive(Debug)]
pub struct ProximityStrategy;

impl InferenceStrategy for ProximityStrategy {
    fn name(&self) -> &'static str {
        "proximity"
    }

    fn propose(&self, ctx: &InferenceContext<'_>, _edges: &EdgeSet) -> Result<Vec<Candidate>> {
        let mut out = Vec::new();
        let threshold = ctx.proximity_threshold;
        for source in ctx.registry.sources() {
            let mentions = source.mentions_by_offset();
            let near = |a: &Mention, b: &Mention| b.start.saturating_sub(a.start) < threshold;
            for (a, b) in pairs_within(&mentions, near) {
                let evidence = slice(&source.text, a.start.min(b.start), a.end.max(b.end));
                let edge = match ctx.table_edge(a.node, b.node) {
                    Some(edge) => edge,
                    None if ctx.registry.node(a.node).entity_type
                        == ctx.registry.node(b.node).entity_type =>
                    {
                        RelationshipEdge::new(ctx.id(a.node), ctx.id(b.node), RelationLabel::Related)
                            .with_weight(SAME_TYPE_WEIGHT)
                            .with_confidence(SAME_TYPE_CONFIDENCE)
                    }
                    None => continue,
                };
                out.push(Candidate::new(edge.with_context(evidence), Guard::SameLabel));
            }
        }
        Ok(out)
    }
}

// =============================================================================
// 2. Section co-occurrence
// =============================================================================

const DEFAULT_SECTION: &str = "BODY";

fn section_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(PREAMBLE|FACTS|ARGUMENTS|ISSUES|ANALYSIS|REASONING|JUDGMENT|JUDGEMENT|CONCLUSION)\b",
        )
        .expect("static section pattern")
    })
}

/// Section headings in `text` as `(offset, name)`, in order.
pub fn section_markers(text: &str) -> Vec<(usize, &str)> {
    section_regex()
        .find_iter(text)
        .map(|m| (m.start(), m.as_str()))
        .collect()
}

/// Section an offset falls into: the last heading at or before it.
pub fn section_at<'a>(markers: &[(usize, &'a str)], offset: usize) -> &'a str {
    markers
        .iter()
        .take_while(|(start, _)| *start <= offset)
        .last()
        .map_or(DEFAULT_SECTION, |&(_, name)| name)
}

/// Table-driven edges between entities sharing a coarse legal section.
#[derive(Debug)]
pub struct SectionStrategy;

impl InferenceStrategy for SectionStrategy {
    fn name(&self) -> &'static str {
        "section"
    }

    fn propose(&self, ctx: &InferenceContext<'_>, _edges: &EdgeSet) -> Result<Vec<Candidate>> {
        let mut out = Vec::new();
        for source in ctx.registry.sources() {
            let markers = section_markers(&source.text);
            let mut sections: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
            for mention in source.mentions_by_offset() {
                let members = sections.entry(section_at(&markers, mention.start)).or_default();
                if !members.contains(&mention.node) {
                    members.push(mention.node);
                }
            }
            for (name, members) in &sections {
                for (i, &a) in members.iter().enumerate() {
                    for &b in &members[i + 1..] {
                        if let Some(edge) = ctx.table_edge(a, b) {
                            let edge = edge.with_context(format!("section {name}"));
                            out.push(Candidate::new(edge, Guard::AnyEdge));
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

// =============================================================================
// 3. Semantic sentence patterns
// =============================================================================

/// Longest gap between two mentions still read as one clause.
const MAX_CLAUSE_GAP: usize = 48;

fn verb_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^,?\s*(?:(?P<aux>was|were|is|are|has\s+been|have\s+been|had\s+been)\s+)?(?:\w+ly\s+)?(?P<verb>cited|cites|relied\s+on|relied\s+upon|relies\s+on|interpreted|interprets|construed|construes|overruled|overrules|affirmed|affirms|reversed|reverses)(?:\s+(?P<by>by))?(?:\s+the)?\s*$",
        )
        .expect("static verb pattern")
    })
}

fn held_in_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bas\s+held\s+in\s*$").expect("static held-in pattern"))
}

/// Label and confidence for a matched verb.
fn verb_relation(verb: &str) -> (RelationLabel, f32) {
    let verb = verb.to_lowercase();
    if verb.starts_with("interpret") || verb.starts_with("constru") {
        (RelationLabel::Interprets, 0.9)
    } else if verb.starts_with("overrul") {
        (RelationLabel::Overrules, 0.9)
    } else if verb.starts_with("affirm") {
        (RelationLabel::Affirms, 0.85)
    } else if verb.starts_with("revers") {
        (RelationLabel::Reverses, 0.85)
    } else {
        (RelationLabel::Cites, 0.85)
    }
}

/// "X cited Y", "Y was interpreted by X", "as held in X" and similar.
#[derive(Debug)]
pub struct SemanticStrategy;

impl SemanticStrategy {
    fn between_mentions(ctx: &InferenceContext<'_>, source: &SourceText, out: &mut Vec<Candidate>) {
        let mentions = source.mentions_by_offset();
        let same_clause = |a: &Mention, b: &Mention| b.start <= a.end + MAX_CLAUSE_GAP;
        for (a, b) in pairs_within(&mentions, same_clause) {
            if a.end > b.start {
                continue;
            }
            let between = slice(&source.text, a.end, b.start);
            let Some(caps) = verb_regex().captures(between) else {
                continue;
            };
            let (label, confidence) = verb_relation(&caps["verb"]);
            let passive = caps.name("by").is_some();
            let (from, to) = if passive { (b.node, a.node) } else { (a.node, b.node) };
            let sentence = slice(&source.text, a.start, b.end);
            let edge = RelationshipEdge::new(ctx.id(from), ctx.id(to), label)
                .with_confidence(confidence)
                .with_context(sentence);
            out.push(Candidate::new(edge, Guard::SameLabel));
        }
    }

    fn held_in(ctx: &InferenceContext<'_>, source: &SourceText, out: &mut Vec<Candidate>) {
        let mentions = source.mentions_by_offset();
        for (i, target) in mentions.iter().enumerate() {
            let prefix = slice(&source.text, 0, target.start);
            let Some(found) = held_in_regex().find(prefix) else {
                continue;
            };
            let citing = mentions[..i]
                .iter()
                .rev()
                .find(|m| m.end <= found.start() && m.node != target.node)
                .map_or(source.anchor_id.as_str(), |m| ctx.id(m.node));
            let edge = RelationshipEdge::new(citing, ctx.id(target.node), RelationLabel::Cites)
                .with_confidence(0.8)
                .with_context(slice(&source.text, found.start(), target.end));
            out.push(Candidate::new(edge, Guard::SameLabel));
        }
    }
}

impl InferenceStrategy for SemanticStrategy {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn propose(&self, ctx: &InferenceContext<'_>, _edges: &EdgeSet) -> Result<Vec<Candidate>> {
        let mut out = Vec::new();
        for source in ctx.registry.sources() {
            Self::between_mentions(ctx, source, &mut out);
            Self::held_in(ctx, source, &mut out);
        }
        Ok(out)
    }
}

// =============================================================================
// 4. Type-specific structural rules
// =============================================================================

/// Connections that hold regardless of distance.
#[derive(Debug)]
pub struct StructuralStrategy;

impl StructuralStrategy {
    fn link_all(
        ctx: &InferenceContext<'_>,
        sources: &[usize],
        targets: &[usize],
        (label, weight, confidence): (RelationLabel, f32, f32),
        when: impl Fn(usize, usize) -> bool,
        out: &mut Vec<Candidate>,
    ) {
        for &s in sources {
            for &t in targets {
                if s != t && when(s, t) {
                    let edge = RelationshipEdge::new(ctx.id(s), ctx.id(t), label)
                        .with_weight(weight)
                        .with_confidence(confidence);
                    out.push(Candidate::new(edge, Guard::SameLabel));
                }
            }
        }
    }
}

fn tagged(registry: &EntityRegistry, tags: &[&str]) -> Vec<usize> {
    tags.iter().flat_map(|tag| registry.with_tag(tag)).collect()
}

impl InferenceStrategy for StructuralStrategy {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn propose(&self, ctx: &InferenceContext<'_>, _edges: &EdgeSet) -> Result<Vec<Candidate>> {
        let registry = ctx.registry;
        let context_mentions =
            |holder: usize, named: usize| registry.node(holder).context.contains(ctx.label(named));

        let statutes = tagged(registry, &["STATUTE"]);
        let provisions = tagged(registry, &["PROVISION"]);
        let cases = tagged(registry, &["PRECEDENT", "CASE"]);
        let mut out = Vec::new();

        Self::link_all(
            ctx,
            &statutes,
            &provisions,
            (RelationLabel::Contains, 0.8, 0.7),
            |statute, provision| context_mentions(provision, statute),
            &mut out,
        );
        Self::link_all(
            ctx,
            &tagged(registry, &["PETITIONER"]),
            &tagged(registry, &["RESPONDENT"]),
            (RelationLabel::Versus, 1.0, 0.8),
            |_, _| true,
            &mut out,
        );
        Self::link_all(
            ctx,
            registry.of_type(EntityType::JudicialEntity),
            registry.of_type(EntityType::Court),
            (RelationLabel::PresidesIn, 0.6, 0.5),
            |_, _| true,
            &mut out,
        );
        Self::link_all(
            ctx,
            &cases,
            &statutes,
            (RelationLabel::Interprets, 0.7, 0.6),
            |case, statute| context_mentions(case, statute),
            &mut out,
        );
        Ok(out)
    }
}

// =============================================================================
// 5. Citation and precedent network
// =============================================================================

/// Case citations whose labels contain one another.
#[derive(Debug)]
pub struct CitationNetworkStrategy;

impl InferenceStrategy for CitationNetworkStrategy {
    fn name(&self) -> &'static str {
        "citation_network"
    }

    fn propose(&self, ctx: &InferenceContext<'_>, edges: &EdgeSet) -> Result<Vec<Candidate>> {
        let cases = ctx.registry.of_type(EntityType::CaseCitation);
        let mut out = Vec::new();
        for (i, &a) in cases.iter().enumerate() {
            for &b in &cases[i + 1..] {
                let (la, lb) = (ctx.label(a), ctx.label(b));
                if !(la.contains(lb) || lb.contains(la)) {
                    continue;
                }
                if edges.contains(ctx.id(a), ctx.id(b), RelationLabel::RelatedCase) {
                    continue;
                }
                let edge = RelationshipEdge::new(ctx.id(a), ctx.id(b), RelationLabel::RelatedCase)
                    .with_weight(0.5)
                    .with_confidence(0.6);
                out.push(Candidate::new(edge, Guard::SameLabel));
            }
        }
        Ok(out)
    }
}

/// Orders dated case citations; each later case follows every earlier one.
#[derive(Debug)]
pub struct PrecedentChainStrategy;

impl PrecedentChainStrategy {
    /// Earliest neighbouring date per case citation, from committed edges.
    fn case_dates(ctx: &InferenceContext<'_>, edges: &EdgeSet) -> Vec<(String, usize)> {
        let registry = ctx.registry;
        let by_id: BTreeMap<&str, usize> = registry
            .nodes()
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.id.as_str(), idx))
            .collect();

        let mut earliest: BTreeMap<usize, String> = BTreeMap::new();
        for edge in edges.iter() {
            for (case_id, other_id) in [(&edge.source, &edge.target), (&edge.target, &edge.source)] {
                let (Some(&case), Some(&date)) = (by_id.get(case_id.as_str()), by_id.get(other_id.as_str()))
                else {
                    continue;
                };
                if registry.node(case).entity_type != EntityType::CaseCitation
                    || registry.node(date).entity_type != EntityType::LegalDate
                {
                    continue;
                }
                let value = &registry.node(date).normalized_value;
                if value.is_empty() {
                    continue;
                }
                let slot = earliest.entry(case).or_insert_with(|| value.clone());
                if *value < *slot {
                    *slot = value.clone();
                }
            }
        }

        let mut dated: Vec<(String, usize)> = earliest.into_iter().map(|(case, date)| (date, case)).collect();
        dated.sort();
        dated
    }
}

impl InferenceStrategy for PrecedentChainStrategy {
    fn name(&self) -> &'static str {
        "precedent_chain"
    }

    fn propose(&self, ctx: &InferenceContext<'_>, edges: &EdgeSet) -> Result<Vec<Candidate>> {
        let dated = Self::case_dates(ctx, edges);
        let mut out = Vec::new();
        for (i, (earlier_date, earlier)) in dated.iter().enumerate() {
            for (later_date, later) in &dated[i + 1..] {
                if later_date == earlier_date {
                    continue;
                }
                let edge = RelationshipEdge::new(ctx.id(*later), ctx.id(*earlier), RelationLabel::FollowsPrecedent)
                    .with_weight(0.7)
                    .with_confidence(0.6);
                out.push(Candidate::new(edge, Guard::NoReverse));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntitySpan;

    fn span(tag: &str, text: &str, haystack: &str) -> EntitySpan {
        let start = haystack.find(text).unwrap();
        EntitySpan::new(tag, text, start, start + text.len())
    }

    fn registry_for(text: &str, spans: &[(&str, &str)]) -> EntityRegistry {
        let mut registry = EntityRegistry::new(50);
        let src = registry.add_source("doc_1", text);
        for (tag, surface) in spans {
            registry.register(src, &span(tag, surface, text));
        }
        registry
    }

    fn run(registry: &EntityRegistry, strategies: Vec<Box<dyn InferenceStrategy>>) -> EdgeSet {
        let ctx = InferenceContext {
            registry,
            proximity_threshold: 200,
        };
        let mut edges = EdgeSet::new();
        run_strategies(&strategies, &ctx, &mut edges);
        edges
    }

    fn labels(edges: &EdgeSet) -> Vec<RelationLabel> {
        edges.iter().map(|e| e.label).collect()
    }

    #[test]
    fn test_edge_set_dedup_rules() {
        let mut edges = EdgeSet::new();
        assert!(edges.insert(RelationshipEdge::new("a", "b", RelationLabel::Cites)));
        assert!(!edges.insert(RelationshipEdge::new("a", "b", RelationLabel::Cites)));
        assert!(edges.insert(RelationshipEdge::new("b", "a", RelationLabel::Cites)));
        assert!(edges.insert(RelationshipEdge::new("a", "c", RelationLabel::Related)));
        assert!(!edges.insert(RelationshipEdge::new("c", "a", RelationLabel::Related)));
        assert!(!edges.insert(RelationshipEdge::new("a", "a", RelationLabel::Related)));

        let any = Candidate::new(RelationshipEdge::new("c", "a", RelationLabel::Applies), Guard::AnyEdge);
        assert!(!edges.commit(any));
        let rev = Candidate::new(RelationshipEdge::new("d", "e", RelationLabel::FollowsPrecedent), Guard::NoReverse);
        assert!(edges.commit(rev));
        let back = Candidate::new(RelationshipEdge::new("e", "d", RelationLabel::FollowsPrecedent), Guard::NoReverse);
        assert!(!edges.commit(back));
        assert_eq!(edges.len(), 4);
    }

    #[test]
    fn test_proximity_uses_table_then_same_type() {
        let text = "Justice Roberts of the Supreme Court. Later Smith and Brown settled.";
        let registry = registry_for(
            text,
            &[
                ("JUDGE", "Justice Roberts"),
                ("COURT", "Supreme Court"),
                ("PARTY", "Smith"),
                ("PARTY", "Brown"),
            ],
        );
        let edges = run(&registry, vec![Box::new(ProximityStrategy)]);
        let presides = edges.iter().find(|e| e.label == RelationLabel::PresidesIn).unwrap();
        assert_eq!(presides.source, registry.node(0).id);
        assert_eq!(presides.target, registry.node(1).id);
        let related = edges.iter().find(|e| e.label == RelationLabel::Related).unwrap();
        assert!(related.joins(&registry.node(2).id, &registry.node(3).id));
        assert!(related.weight < presides.weight);
        // judge/party and court/party pairs have no rule and differ in type
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_proximity_respects_threshold() {
        let padding = " ".repeat(300);
        let text = format!("Smith{padding}Brown");
        let registry = registry_for(&text, &[("PARTY", "Smith"), ("PARTY", "Brown")]);
        let edges = run(&registry, vec![Box::new(ProximityStrategy)]);
        assert!(edges.is_empty());
    }

    #[test]
    fn test_section_detection() {
        let text = "PREAMBLE intro FACTS the facts ANALYSIS reasoning";
        let markers = section_markers(text);
        assert_eq!(section_at(&markers, 0), "PREAMBLE");
        assert_eq!(section_at(&markers, text.find("the facts").unwrap()), "FACTS");
        assert_eq!(section_at(&markers, text.len() - 1), "ANALYSIS");
        assert_eq!(section_at(&section_markers("no headings"), 3), "BODY");
    }

    #[test]
    fn test_section_links_distant_pairs_once() {
        let padding = " filler".repeat(60);
        let text = format!("ANALYSIS Jones v. Smith{padding} 42 U.S.C. § 1983");
        let registry = registry_for(&text, &[("CASE", "Jones v. Smith"), ("STATUTE", "42 U.S.C. § 1983")]);
        let edges = run(&registry, vec![Box::new(ProximityStrategy), Box::new(SectionStrategy)]);
        assert_eq!(labels(&edges), vec![RelationLabel::Interprets]);
        assert_eq!(edges.iter().next().unwrap().context, "section ANALYSIS");
    }

    #[test]
    fn test_semantic_active_and_passive() {
        let text = "Brown v. Board cited Plessy v. Ferguson. Smith v. Jones was interpreted by Roe v. Wade.";
        let registry = registry_for(
            text,
            &[
                ("CASE", "Brown v. Board"),
                ("CASE", "Plessy v. Ferguson"),
                ("CASE", "Smith v. Jones"),
                ("CASE", "Roe v. Wade"),
            ],
        );
        let edges = run(&registry, vec![Box::new(SemanticStrategy)]);
        let cites = edges.iter().find(|e| e.label == RelationLabel::Cites).unwrap();
        assert_eq!(cites.source, registry.node(0).id);
        assert_eq!(cites.target, registry.node(1).id);
        assert!((cites.confidence - 0.85).abs() < f32::EPSILON);

        let interprets = edges.iter().find(|e| e.label == RelationLabel::Interprets).unwrap();
        assert_eq!(interprets.source, registry.node(3).id);
        assert_eq!(interprets.target, registry.node(2).id);
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_semantic_passive_without_auxiliary() {
        let text = "Roe v. Wade, cited by Casey v. Planned, remains good law. \
                    Brown v. Board, relied on by Smith v. Jones, stands.";
        let registry = registry_for(
            text,
            &[
                ("CASE", "Roe v. Wade"),
                ("CASE", "Casey v. Planned"),
                ("CASE", "Brown v. Board"),
                ("CASE", "Smith v. Jones"),
            ],
        );
        let edges = run(&registry, vec![Box::new(SemanticStrategy)]);
        let cites: Vec<_> = edges
            .iter()
            .filter(|e| e.label == RelationLabel::Cites)
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect();
        assert_eq!(
            cites,
            vec![
                (registry.node(1).id.clone(), registry.node(0).id.clone()),
                (registry.node(3).id.clone(), registry.node(2).id.clone()),
            ]
        );
    }

    #[test]
    fn test_pair_scan_stops_out_of_reach() {
        let mentions: Vec<Mention> = (0..6000)
            .map(|i| Mention {
                node: i,
                start: i * 10,
                end: i * 10 + 5,
            })
            .collect();
        let near = |a: &Mention, b: &Mention| b.start - a.start < 25;
        let pairs: Vec<_> = pairs_within(&mentions, near).collect();
        // each mention reaches the next two
        assert_eq!(pairs.len(), 2 * 6000 - 3);
        assert!(pairs.iter().all(|(a, b)| b.start - a.start < 25));

        let repeated = [
            Mention { node: 0, start: 0, end: 3 },
            Mention { node: 0, start: 4, end: 7 },
            Mention { node: 1, start: 8, end: 9 },
        ];
        let pairs: Vec<_> = pairs_within(&repeated, |_: &Mention, _: &Mention| true).collect();
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_semantic_held_in() {
        let text = "Brown v. Board applies, as held in Plessy v. Ferguson.";
        let registry = registry_for(text, &[("CASE", "Brown v. Board"), ("CASE", "Plessy v. Ferguson")]);
        let edges = run(&registry, vec![Box::new(SemanticStrategy)]);
        let edge = edges.iter().next().unwrap();
        assert_eq!(edge.label, RelationLabel::Cites);
        assert_eq!(edge.source, registry.node(0).id);

        let lone = registry_for("As held in Roe v. Wade, it stands.", &[("CASE", "Roe v. Wade")]);
        let edges = run(&lone, vec![Box::new(SemanticStrategy)]);
        assert_eq!(edges.iter().next().unwrap().source, "doc_1");
    }

    #[test]
    fn test_structural_rules() {
        let text = "Under 42 U.S.C. § 1983, see Section 1983(a) of 42 U.S.C. § 1983. \
                    Acme, the petitioner, sued Brown, the respondent.";
        let mut registry = EntityRegistry::new(80);
        let src = registry.add_source("doc_1", text);
        registry.register(src, &span("STATUTE", "42 U.S.C. § 1983", text));
        registry.register(src, &span("PROVISION", "Section 1983(a)", text));
        registry.register(src, &span("PETITIONER", "Acme", text));
        registry.register(src, &span("RESPONDENT", "Brown", text));

        let edges = run(&registry, vec![Box::new(StructuralStrategy)]);
        assert!(edges.contains(&registry.node(0).id, &registry.node(1).id, RelationLabel::Contains));
        assert!(edges.contains(&registry.node(3).id, &registry.node(2).id, RelationLabel::Versus));
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn test_citation_network_substring() {
        let text = "Jones v. Smith and later Smith alone, plus Roe v. Wade.";
        let registry = registry_for(text, &[("CASE", "Jones v. Smith"), ("CASE", "Smith"), ("CASE", "Roe v. Wade")]);
        let edges = run(&registry, vec![Box::new(CitationNetworkStrategy)]);
        assert_eq!(labels(&edges), vec![RelationLabel::RelatedCase]);
        let edge = edges.iter().next().unwrap();
        assert!(edge.joins(&registry.node(0).id, &registry.node(1).id));
        assert!((edge.weight - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_precedent_chain_orders_by_date() {
        let text = "FACTS Roe v. Wade was decided January 22, 1973. \
                    ANALYSIS In this later matter, Casey v. Planned was decided June 29, 1992.";
        let registry = registry_for(
            text,
            &[
                ("CASE", "Roe v. Wade"),
                ("DATE", "January 22, 1973"),
                ("CASE", "Casey v. Planned"),
                ("DATE", "June 29, 1992"),
            ],
        );
        let ctx = InferenceContext {
            registry: &registry,
            proximity_threshold: 30,
        };
        let mut edges = EdgeSet::new();
        run_strategies(&default_strategies(), &ctx, &mut edges);

        let follows: Vec<_> = edges
            .iter()
            .filter(|e| e.label == RelationLabel::FollowsPrecedent)
            .collect();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].source, registry.node(2).id);
        assert_eq!(follows[0].target, registry.node(0).id);
    }

    #[derive(Debug)]
    struct Broken;

    impl InferenceStrategy for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn propose(&self, _ctx: &InferenceContext<'_>, _edges: &EdgeSet) -> Result<Vec<Candidate>> {
            anyhow::bail!("malformed pattern")
        }
    }

    #[test]
    fn test_failing_strategy_is_skipped() {
        let text = "Smith and Brown";
        let registry = registry_for(text, &[("PARTY", "Smith"), ("PARTY", "Brown")]);
        let edges = run(&registry, vec![Box::new(Broken), Box::new(ProximityStrategy)]);
        assert_eq!(edges.len(), 1);
    }
}
