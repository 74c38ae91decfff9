//! Studio, room, and membership directory.
//!
//! Backs every role lookup the ingress performs. Static records only; the
//! runtime room state (live flag, transcript, seq) lives in the registry, and
//! this service keeps the registry's entry set in step with room creation and
//! removal.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use crate::models::{Action, Membership, Role, Room, RoomId, Studio, StudioId, UserId};
use crate::{Error, Result};

use super::registry::RoomRegistry;

pub struct Directory {
    studios: DashMap<StudioId, Studio>,
    rooms: DashMap<RoomId, Room>,
    memberships: DashMap<(StudioId, UserId), Role>,
    registry: Arc<RoomRegistry>,
    max_rooms_per_studio: usize,
}

impl Directory {
    #[must_use]
    pub fn new(registry: Arc<RoomRegistry>, max_rooms_per_studio: usize) -> Self {
        Self {
            studios: DashMap::new(),
            rooms: DashMap::new(),
            memberships: DashMap::new(),
            registry,
            max_rooms_per_studio,
        }
    }

    /// Create a studio; the creator becomes its Owner.
    pub fn create_studio(&self, name: String, owner: UserId) -> Result<Studio> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Studio name must not be empty".to_string()));
        }
        let studio = Studio::new(name, owner.clone());
        self.memberships
            .insert((studio.id.clone(), owner), Role::Owner);
        self.studios.insert(studio.id.clone(), studio.clone());
        info!(studio_id = %studio.id, name = %studio.name, "Studio created");
        Ok(studio)
    }

    /// Create a room in a studio. The actor needs management rights; rooms
    /// get sequential numbers within the studio and a registry entry.
    pub fn create_room(&self, studio_id: &StudioId, name: String, actor: &UserId) -> Result<Room> {
        self.require_role(studio_id, actor, Action::ManageRoom)?;
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Room name must not be empty".to_string()));
        }
        let existing = self
            .rooms
            .iter()
            .filter(|r| r.studio_id == *studio_id)
            .count();
        if existing >= self.max_rooms_per_studio {
            return Err(Error::InvalidInput(format!(
                "Studio already has the maximum of {} rooms",
                self.max_rooms_per_studio
            )));
        }

        let number = {
            let mut studio = self
                .studios
                .get_mut(studio_id)
                .ok_or_else(|| Error::NotFound(format!("Studio {studio_id}")))?;
            let number = studio.next_room_number;
            studio.next_room_number += 1;
            number
        };

        let room = Room {
            id: RoomId::new(),
            studio_id: studio_id.clone(),
            name,
            number,
            created_at: chrono::Utc::now(),
        };
        self.rooms.insert(room.id.clone(), room.clone());
        self.registry.insert(room.id.clone());
        info!(room_id = %room.id, studio_id = %studio_id, number, "Room created");
        Ok(room)
    }

    /// Remove a room and its registry entry. The caller is responsible for
    /// closing the room's subscribers first.
    pub fn remove_room(&self, room_id: &RoomId, actor: &UserId) -> Result<Room> {
        let room = self.room(room_id)?;
        self.require_role(&room.studio_id, actor, Action::ManageRoom)?;
        self.rooms.remove(room_id);
        self.registry.remove(room_id);
        info!(room_id = %room_id, "Room removed");
        Ok(room)
    }

    pub fn room(&self, room_id: &RoomId) -> Result<Room> {
        self.rooms
            .get(room_id)
            .map(|r| r.clone())
            .ok_or_else(|| Error::NotFound(format!("Room {room_id}")))
    }

    pub fn studio(&self, studio_id: &StudioId) -> Result<Studio> {
        self.studios
            .get(studio_id)
            .map(|s| s.clone())
            .ok_or_else(|| Error::NotFound(format!("Studio {studio_id}")))
    }

    /// The user's role in the studio, if any.
    #[must_use]
    pub fn role_of(&self, studio_id: &StudioId, user_id: &UserId) -> Option<Role> {
        self.memberships
            .get(&(studio_id.clone(), user_id.clone()))
            .map(|r| *r)
    }

    /// The user's role in the room's studio, if any.
    pub fn room_role(&self, room_id: &RoomId, user_id: &UserId) -> Result<Option<Role>> {
        let room = self.room(room_id)?;
        Ok(self.role_of(&room.studio_id, user_id))
    }

    /// Resolve the actor's role and check it against the action's minimum.
    pub fn require_role(
        &self,
        studio_id: &StudioId,
        actor: &UserId,
        action: Action,
    ) -> Result<Role> {
        let role = self
            .role_of(studio_id, actor)
            .ok_or_else(|| Error::Unauthorized("Not a member of this studio".to_string()))?;
        if !role.allows(action) {
            return Err(Error::Unauthorized(format!(
                "Requires at least the {} role",
                action.required_role()
            )));
        }
        Ok(role)
    }

    /// Assign a role below Owner. Ownership moves only through
    /// [`Directory::transfer_ownership`], keeping Owner unique per studio.
    pub fn set_role(
        &self,
        studio_id: &StudioId,
        actor: &UserId,
        target: UserId,
        role: Role,
    ) -> Result<Membership> {
        self.require_role(studio_id, actor, Action::ManageRoom)?;
        if role == Role::Owner {
            return Err(Error::InvalidInput(
                "Ownership is assigned via transfer, not set_role".to_string(),
            ));
        }
        let studio = self.studio(studio_id)?;
        if studio.owner == target {
            return Err(Error::InvalidInput(
                "The studio owner's role cannot be reassigned".to_string(),
            ));
        }
        self.memberships
            .insert((studio_id.clone(), target.clone()), role);
        Ok(Membership {
            studio_id: studio_id.clone(),
            user_id: target,
            role,
        })
    }

    /// Hand the studio to a new owner; the previous owner becomes Admin.
    pub fn transfer_ownership(
        &self,
        studio_id: &StudioId,
        actor: &UserId,
        new_owner: UserId,
    ) -> Result<()> {
        self.require_role(studio_id, actor, Action::TransferOwnership)?;
        let previous = {
            let mut studio = self
                .studios
                .get_mut(studio_id)
                .ok_or_else(|| Error::NotFound(format!("Studio {studio_id}")))?;
            let previous = studio.owner.clone();
            studio.owner = new_owner.clone();
            previous
        };
        self.memberships
            .insert((studio_id.clone(), new_owner.clone()), Role::Owner);
        self.memberships
            .insert((studio_id.clone(), previous), Role::Admin);
        info!(studio_id = %studio_id, new_owner = %new_owner, "Ownership transferred");
        Ok(())
    }
}
