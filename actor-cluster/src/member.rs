use std::fmt::{Display, Formatter};

use ahash::HashSet;

use actor_core::actor::address::{Address, UniqueAddress};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Member {
    pub unique_address: UniqueAddress,
    pub status: MemberStatus,
    /// Join sequence assigned by the membership protocol once the node is Up, lower is older.
    pub up_number: u64,
    pub roles: HashSet<String>,
    /// Status the member had before it became unreachable.
    pub(crate) reachable_status: Option<MemberStatus>,
}

impl Member {
    pub fn new(unique_address: UniqueAddress, status: MemberStatus, roles: HashSet<String>) -> Self {
        Self {
            unique_address,
            status,
            up_number: 0,
            roles,
            reachable_status: None,
        }
    }

    pub fn address(&self) -> &Address {
        &self.unique_address.address
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Status ignoring reachability.
    pub fn base_status(&self) -> MemberStatus {
        match self.status {
            MemberStatus::Unreachable => self.reachable_status.unwrap_or(MemberStatus::Unreachable),
            status => status,
        }
    }

    /// Down and Exiting members no longer host anything.
    pub fn is_gone(&self) -> bool {
        matches!(self.base_status(), MemberStatus::Exiting | MemberStatus::Down)
    }

    pub(crate) fn advance(&mut self, target: MemberStatus) -> bool {
        if target == MemberStatus::Down && self.status == MemberStatus::Unreachable {
            self.status = MemberStatus::Down;
            self.reachable_status = None;
            return true;
        }
        match self.status {
            MemberStatus::Unreachable => {
                let current = self.reachable_status.unwrap_or(MemberStatus::Joining);
                if current.lifecycle_order() < target.lifecycle_order() {
                    self.reachable_status = Some(target);
                    true
                } else {
                    false
                }
            }
            current => {
                if current.lifecycle_order() < target.lifecycle_order() {
                    self.status = target;
                    true
                } else {
                    false
                }
            }
        }
    }
}

impl Display for Member {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Member({}, {:?}, up_number {})", self.unique_address, self.status, self.up_number)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MemberStatus {
    Joining,
    Up,
    Leaving,
    Exiting,
    Down,
    Unreachable,
}

impl MemberStatus {
    /// Statuses only ever move forward in this order. Unreachable sits outside of it.
    fn lifecycle_order(&self) -> u8 {
        match self {
            MemberStatus::Joining => 0,
            MemberStatus::Up => 1,
            MemberStatus::Leaving => 2,
            MemberStatus::Exiting => 3,
            MemberStatus::Down => 4,
            MemberStatus::Unreachable => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use actor_core::actor::address::{Address, UniqueAddress};

    use crate::member::{Member, MemberStatus};

    fn member(status: MemberStatus) -> Member {
        let address = UniqueAddress::new(Address::new("test", "127.0.0.1", 2551), 1);
        Member::new(address, status, Default::default())
    }

    #[test]
    fn test_status_never_moves_backward() {
        let mut m = member(MemberStatus::Leaving);
        assert!(!m.advance(MemberStatus::Up));
        assert_eq!(m.status, MemberStatus::Leaving);
        assert!(m.advance(MemberStatus::Exiting));
        assert!(m.is_gone());
    }

    #[test]
    fn test_unreachable_keeps_lifecycle_status() {
        let mut m = member(MemberStatus::Up);
        m.reachable_status = Some(MemberStatus::Up);
        m.status = MemberStatus::Unreachable;
        assert!(m.advance(MemberStatus::Leaving));
        assert_eq!(m.status, MemberStatus::Unreachable);
        assert_eq!(m.base_status(), MemberStatus::Leaving);
        assert!(m.advance(MemberStatus::Down));
        assert_eq!(m.status, MemberStatus::Down);
    }
}
