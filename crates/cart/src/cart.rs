use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coursemart_core::{Aggregate, AggregateId, AggregateRoot, CourseId, DomainError, Entity, UserId};
use coursemart_events::Event;

/// Cart identifier. Exactly one cart stream exists per user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(pub AggregateId);

impl CartId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// Deterministic cart stream key for a user.
    pub fn for_user(user_id: UserId) -> Self {
        Self(AggregateId::derive("cart", &[user_id.as_uuid()]))
    }
}

impl core::fmt::Display for CartId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A pre-purchase selection line. Unique per course within a cart;
/// consumed when the course is checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub course_id: CourseId,
    pub added_at: DateTime<Utc>,
}

impl Entity for CartItem {
    type Id = CourseId;

    fn id(&self) -> &Self::Id {
        &self.course_id
    }
}

/// Aggregate root: Cart.
///
/// A cart exists implicitly for every user: an empty stream is an empty cart,
/// so there is no explicit create command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    id: CartId,
    user_id: Option<UserId>,
    items: Vec<CartItem>,
    version: u64,
}

impl Cart {
    /// Create an empty aggregate instance for rehydration.
    pub fn empty(id: CartId) -> Self {
        Self {
            id,
            user_id: None,
            items: Vec::new(),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> CartId {
        self.id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn contains(&self, course_id: CourseId) -> bool {
        self.items.iter().any(|item| item.course_id == course_id)
    }
}

impl AggregateRoot for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AddItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub cart_id: CartId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub cart_id: CartId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartCommand {
    AddItem(AddItem),
    RemoveItem(RemoveItem),
}

/// Event: ItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub added_at: DateTime<Utc>,
}

/// Event: ItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartEvent {
    ItemAdded(ItemAdded),
    ItemRemoved(ItemRemoved),
}

impl Event for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded(_) => "cart.item_added",
            CartEvent::ItemRemoved(_) => "cart.item_removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CartEvent::ItemAdded(e) => e.added_at,
            CartEvent::ItemRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Cart {
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CartEvent::ItemAdded(e) => {
                self.user_id = Some(e.user_id);
                self.items.push(CartItem {
                    course_id: e.course_id,
                    added_at: e.added_at,
                });
            }
            CartEvent::ItemRemoved(e) => {
                self.items.retain(|item| item.course_id != e.course_id);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddItem(cmd) => self.handle_add(cmd),
            CartCommand::RemoveItem(cmd) => self.handle_remove(cmd),
        }
    }
}

impl Cart {
    fn ensure_cart_id(&self, cart_id: CartId) -> Result<(), DomainError> {
        if self.id != cart_id {
            return Err(DomainError::invariant("cart_id mismatch"));
        }
        Ok(())
    }

    fn handle_add(&self, cmd: &AddItem) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_cart_id(cmd.cart_id)?;

        if self.contains(cmd.course_id) {
            return Err(DomainError::conflict("course is already in the cart"));
        }

        Ok(vec![CartEvent::ItemAdded(ItemAdded {
            user_id: cmd.user_id,
            course_id: cmd.course_id,
            added_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveItem) -> Result<Vec<CartEvent>, DomainError> {
        self.ensure_cart_id(cmd.cart_id)?;

        // Removal is idempotent: removing an absent line is a no-op.
        if !self.contains(cmd.course_id) {
            return Ok(vec![]);
        }

        Ok(vec![CartEvent::ItemRemoved(ItemRemoved {
            user_id: cmd.user_id,
            course_id: cmd.course_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user_id() -> UserId {
        UserId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn cart_for(user_id: UserId) -> Cart {
        Cart::empty(CartId::for_user(user_id))
    }

    fn add_cmd(user_id: UserId, course_id: CourseId) -> CartCommand {
        CartCommand::AddItem(AddItem {
            cart_id: CartId::for_user(user_id),
            user_id,
            course_id,
            occurred_at: test_time(),
        })
    }

    fn remove_cmd(user_id: UserId, course_id: CourseId) -> CartCommand {
        CartCommand::RemoveItem(RemoveItem {
            cart_id: CartId::for_user(user_id),
            user_id,
            course_id,
            occurred_at: test_time(),
        })
    }

    #[test]
    fn add_item_emits_item_added() {
        let user_id = test_user_id();
        let course_id = CourseId::new();
        let cart = cart_for(user_id);

        let events = cart.handle(&add_cmd(user_id, course_id)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            CartEvent::ItemAdded(e) => {
                assert_eq!(e.user_id, user_id);
                assert_eq!(e.course_id, course_id);
            }
            _ => panic!("Expected ItemAdded event"),
        }
    }

    #[test]
    fn duplicate_add_is_a_conflict() {
        let user_id = test_user_id();
        let course_id = CourseId::new();
        let mut cart = cart_for(user_id);

        let events = cart.handle(&add_cmd(user_id, course_id)).unwrap();
        cart.apply(&events[0]);

        let err = cart.handle(&add_cmd(user_id, course_id)).unwrap_err();
        match err {
            DomainError::Conflict(msg) if msg.contains("already in the cart") => {}
            _ => panic!("Expected Conflict for duplicate add"),
        }
    }

    #[test]
    fn remove_is_idempotent() {
        let user_id = test_user_id();
        let course_id = CourseId::new();
        let cart = cart_for(user_id);

        // Removing from an empty cart emits nothing.
        let events = cart.handle(&remove_cmd(user_id, course_id)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn removed_course_can_be_added_again() {
        let user_id = test_user_id();
        let course_id = CourseId::new();
        let mut cart = cart_for(user_id);

        let events = cart.handle(&add_cmd(user_id, course_id)).unwrap();
        cart.apply(&events[0]);
        let events = cart.handle(&remove_cmd(user_id, course_id)).unwrap();
        cart.apply(&events[0]);
        assert!(cart.items().is_empty());

        let events = cart.handle(&add_cmd(user_id, course_id)).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn version_increments_on_apply() {
        let user_id = test_user_id();
        let mut cart = cart_for(user_id);
        assert_eq!(cart.version(), 0);

        let events = cart.handle(&add_cmd(user_id, CourseId::new())).unwrap();
        cart.apply(&events[0]);
        assert_eq!(cart.version(), 1);

        let events = cart.handle(&add_cmd(user_id, CourseId::new())).unwrap();
        cart.apply(&events[0]);
        assert_eq!(cart.version(), 2);
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let user_id = test_user_id();
        let course_id = CourseId::new();
        let cart = cart_for(user_id);

        let cmd = add_cmd(user_id, course_id);
        let events1 = cart.handle(&cmd).unwrap();
        let events2 = cart.handle(&cmd).unwrap();

        assert_eq!(cart.version(), 0);
        assert!(cart.items().is_empty());
        assert_eq!(events1, events2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: after any interleaving of add/remove over a fixed
            /// course pool, cart lines stay unique per course.
            #[test]
            fn lines_stay_unique(ops in proptest::collection::vec((0usize..4, any::<bool>()), 0..40)) {
                let user_id = UserId::new();
                let courses: Vec<CourseId> = (0..4).map(|_| CourseId::new()).collect();
                let mut cart = Cart::empty(CartId::for_user(user_id));

                for (idx, add) in ops {
                    let cmd = if add {
                        add_cmd(user_id, courses[idx])
                    } else {
                        remove_cmd(user_id, courses[idx])
                    };

                    if let Ok(events) = cart.handle(&cmd) {
                        for ev in &events {
                            cart.apply(ev);
                        }
                    }
                }

                let mut seen = std::collections::HashSet::new();
                for item in cart.items() {
                    prop_assert!(seen.insert(item.course_id));
                }
            }
        }
    }
}
