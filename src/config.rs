/// Tunables for the membership core.
#[derive(Debug, Clone)]
pub struct MembershipConfig {
    /// Maximum number of participants linked to one mentor.
    pub mentor_capacity: usize,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self { mentor_capacity: 5 }
    }
}

impl MembershipConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mentor_capacity(mut self, capacity: usize) -> Self {
        self.mentor_capacity = capacity;
        self
    }
}
