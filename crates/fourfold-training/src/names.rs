use rand::{Rng, seq::IndexedRandom as _};

use crate::population::AgentId;

const DEFAULT_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Blaise", "Charles", "Claude", "Dennis", "Donald", "Edsger",
    "Emmy", "Frances", "Grace", "Hedy", "Ivan", "John", "Joan", "Ken", "Leslie", "Margaret",
    "Niklaus", "Radia", "Robin", "Sophie", "Tim", "Tony", "Ward",
];

/// Candidate names handed out to newly created agents.
///
/// Each spawn or birth draws one name at random and suffixes it with the agent id,
/// so names stay unique even when the pool is small.
#[derive(Debug, Clone)]
pub struct NamePool {
    names: Vec<String>,
}

impl Default for NamePool {
    fn default() -> Self {
        Self {
            names: DEFAULT_NAMES.iter().map(|&name| name.to_owned()).collect(),
        }
    }
}

impl NamePool {
    /// Creates a pool from explicit names. Returns `None` if `names` is empty.
    #[must_use]
    pub fn new(names: Vec<String>) -> Option<Self> {
        (!names.is_empty()).then_some(Self { names })
    }

    /// Parses one name per line, skipping blank lines and `#` comments.
    ///
    /// ```
    /// use fourfold_training::names::NamePool;
    ///
    /// let pool = NamePool::from_lines("# bots\nAda\n\n  Grace \n").unwrap();
    /// assert_eq!(pool.names(), &["Ada", "Grace"]);
    /// ```
    #[must_use]
    pub fn from_lines(text: &str) -> Option<Self> {
        let names = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_owned)
            .collect();
        Self::new(names)
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Draws a name and tags it with `id`, e.g. `"Ada #00042"`.
    pub fn name_for<R>(&self, id: AgentId, rng: &mut R) -> String
    where
        R: Rng + ?Sized,
    {
        let base = self.names.choose(rng).map_or("Agent", String::as_str);
        format!("{base} {id}")
    }
}
