use crate::search::types::{ProjectId, QueryId};
use serde::{Deserialize, Serialize};

/// Verdict of a single judge call, relative to the order the projects were shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The first (left) project is more relevant
    Left,
    /// The second (right) project is more relevant
    Right,
    /// Neither project is clearly more relevant
    Tie,
}

/// Winner of an adjudicated pair, relative to the canonical [`PairKey`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Winner {
    /// `item_a_id` (the smaller id) won
    #[serde(rename = "A")]
    A,
    /// `item_b_id` (the larger id) won
    #[serde(rename = "B")]
    B,
    /// No winner
    #[serde(rename = "TIE")]
    Tie,
}

impl Winner {
    /// Returns the label used in prompts, logs, and bias reasoning.
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::A => "A",
            Winner::B => "B",
            Winner::Tie => "TIE",
        }
    }

    /// Returns the winner seen from the other side of the pair.
    pub fn swapped(self) -> Self {
        match self {
            Winner::A => Winner::B,
            Winner::B => Winner::A,
            Winner::Tie => Winner::Tie,
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unordered pair of projects in canonical orientation (`a < b`).
///
/// # Examples
///
/// ```
/// use ranksight_core::judge::PairKey;
/// use ranksight_core::search::ProjectId;
///
/// let (key, swapped) = PairKey::new(ProjectId::from_u64(9), ProjectId::from_u64(4));
/// assert_eq!(key.a(), ProjectId::from_u64(4));
/// assert!(swapped);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    a: ProjectId,
    b: ProjectId,
}

impl PairKey {
    /// Builds the canonical key for `(x, y)`.
    ///
    /// The returned flag is true when `x > y`, i.e. when the caller's
    /// orientation had to be flipped.
    pub fn new(x: ProjectId, y: ProjectId) -> (Self, bool) {
        if x <= y {
            (Self { a: x, b: y }, false)
        } else {
            (Self { a: y, b: x }, true)
        }
    }

    /// The smaller id.
    pub fn a(&self) -> ProjectId {
        self.a
    }

    /// The larger id.
    pub fn b(&self) -> ProjectId {
        self.b
    }
}

/// Adjudicated outcome for one unordered pair under one query.
///
/// Always stored in canonical orientation: `item_a_id < item_b_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    /// Query the pair was judged against
    pub query_id: QueryId,
    /// Smaller project id of the pair
    pub item_a_id: ProjectId,
    /// Larger project id of the pair
    pub item_b_id: ProjectId,
    /// Adjudicated winner
    pub winner: Winner,
    /// Judge reasoning, or the position-bias marker
    pub reasoning: String,
    /// Model that produced the evidence
    pub evidence_model: String,
    /// True when the tie came from the two runs disagreeing
    #[serde(default)]
    pub position_bias: bool,
}

impl Judgment {
    /// Canonical pair this judgment covers.
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.item_a_id, self.item_b_id).0
    }

    /// Returns true if `id` is one of the two judged items.
    pub fn involves(&self, id: ProjectId) -> bool {
        self.item_a_id == id || self.item_b_id == id
    }
}

/// What the judge sees of a project.
///
/// Fields are optional because indexed projects are frequently incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProfile {
    /// Project identifier
    pub id: ProjectId,
    /// Industry name
    #[serde(default)]
    pub industry: Option<String>,
    /// Position or role held on the project
    #[serde(default)]
    pub role: Option<String>,
    /// Skill names, most relevant first
    #[serde(default)]
    pub skills: Vec<String>,
    /// Free-text description of the contribution
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectProfile {
    /// Creates an empty profile for `id`.
    pub fn new(id: ProjectId) -> Self {
        Self {
            id,
            industry: None,
            role: None,
            skills: Vec::new(),
            description: None,
        }
    }
}

/// Answer from a single judge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Which side won
    pub verdict: Verdict,
    /// Free-text justification
    pub reasoning: String,
}

impl Comparison {
    /// Creates a comparison result.
    pub fn new(verdict: Verdict, reasoning: impl Into<String>) -> Self {
        Self {
            verdict,
            reasoning: reasoning.into(),
        }
    }
}
