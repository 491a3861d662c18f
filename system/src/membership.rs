use crate::message::ConnectionId;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub username: String,
}

impl Member {
    pub fn new(connection_id: ConnectionId, username: impl Into<String>) -> Self {
        Self {
            connection_id,
            username: username.into(),
        }
    }
}

/// A join request waiting for the creator's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// Distinguishes successive requests from the same connection.
    pub request_id: u64,
    pub requester: ConnectionId,
    pub username: String,
}

/// Outcome of removing a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub member: Member,
    /// Set when the departed member was the creator and someone remains.
    pub new_creator: Option<ConnectionId>,
}

/// Ordered members of one room, the creator pointer and pending join
/// decisions.
///
/// Identity is the display name: a second connection using a name already in
/// the room is treated as that member reconnecting. Two different people
/// sharing a name cannot be told apart.
#[derive(Debug, Clone)]
pub struct Membership {
    members: Vec<Member>,
    creator: ConnectionId,
    pending: HashMap<ConnectionId, JoinRequest>,
}

impl Membership {
    pub fn new(creator: Member) -> Self {
        Self {
            creator: creator.connection_id,
            members: vec![creator],
            pending: HashMap::new(),
        }
    }

    pub fn creator(&self) -> ConnectionId {
        self.creator
    }

    pub fn is_creator(&self, connection_id: ConnectionId) -> bool {
        self.creator == connection_id
    }

    pub fn set_creator(&mut self, connection_id: ConnectionId) {
        self.creator = connection_id;
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.username.clone()).collect()
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.members.iter().map(|m| m.connection_id).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.members.iter().any(|m| m.connection_id == connection_id)
    }

    pub fn find_by_name(&self, username: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.username == username)
    }

    /// Appends a member. At most one member per connection; returns `false`
    /// if the connection is already present.
    pub fn admit(&mut self, member: Member) -> bool {
        if self.contains(member.connection_id) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// Points the member named `username` at a new connection, keeping its
    /// position in join order. The creator role follows the member.
    /// Returns the previous connection.
    pub fn rebind(&mut self, username: &str, connection_id: ConnectionId) -> Option<ConnectionId> {
        let member = self.members.iter_mut().find(|m| m.username == username)?;
        let previous = member.connection_id;
        member.connection_id = connection_id;
        if self.creator == previous {
            self.creator = connection_id;
        }
        Some(previous)
    }

    /// Removes the member bound to `connection_id`. If it held the creator
    /// role, the earliest-joined remaining member becomes creator.
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<Departure> {
        let index = self
            .members
            .iter()
            .position(|m| m.connection_id == connection_id)?;
        Some(self.remove_at(index))
    }

    fn remove_at(&mut self, index: usize) -> Departure {
        let member = self.members.remove(index);
        let new_creator = if member.connection_id == self.creator {
            self.members.first().map(|next| {
                log::debug!(
                    "creator {} left, promoting {}",
                    member.username,
                    next.username
                );
                next.connection_id
            })
        } else {
            None
        };
        if let Some(next) = new_creator {
            self.creator = next;
        }
        Departure {
            member,
            new_creator,
        }
    }

    /// Only one pending decision per requester; a newer request replaces the
    /// older one, which is returned.
    pub fn add_pending(&mut self, request: JoinRequest) -> Option<JoinRequest> {
        self.pending.insert(request.requester, request)
    }

    pub fn take_pending(&mut self, requester: ConnectionId) -> Option<JoinRequest> {
        self.pending.remove(&requester)
    }

    /// Removes the pending request only if it is still the one identified by
    /// `request_id`.
    pub fn expire_pending(&mut self, requester: ConnectionId, request_id: u64) -> Option<JoinRequest> {
        match self.pending.get(&requester) {
            Some(request) if request.request_id == request_id => self.pending.remove(&requester),
            _ => None,
        }
    }

    pub fn drain_pending(&mut self) -> Vec<JoinRequest> {
        self.pending.drain().map(|(_, request)| request).collect()
    }

    pub fn has_pending(&self, requester: ConnectionId) -> bool {
        self.pending.contains_key(&requester)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
