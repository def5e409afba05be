//! Typed UUID identifiers.
//!
//! Every entity gets its own newtype so an order ID can never be passed
//! where a lot ID is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of an authenticated user (customer).
    UserId
);
uuid_id!(
    /// Identifier of a delivery address owned by a user.
    AddressId
);
uuid_id!(
    /// Identifier of a shopping cart.
    CartId
);
uuid_id!(
    /// Identifier of a single cart line.
    CartItemId
);
uuid_id!(
    /// Identifier of a catalog product.
    ProductId
);
uuid_id!(
    /// Identifier of a seller account.
    SellerId
);
uuid_id!(
    /// Identifier of a dated inventory lot, the unit of stock reservation.
    LotId
);
uuid_id!(
    /// Identifier of an order.
    OrderId
);
uuid_id!(
    /// Identifier of an order line snapshot.
    OrderItemId
);
uuid_id!(
    /// Identifier of a payment attempt or refund record.
    PaymentId
);
uuid_id!(
    /// Identifier of a shipment (exactly one per order).
    ShipmentId
);
uuid_id!(
    /// Identifier of one leg of a shipment route.
    LegId
);
uuid_id!(
    /// Identifier of an append-only tracking event.
    TrackingEventId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(OrderId::new(), OrderId::new());
        assert_ne!(LotId::new(), LotId::new());
    }

    #[test]
    fn id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = UserId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn id_serialization_roundtrip() {
        let id = ShipmentId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: ShipmentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = PaymentId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
