//! String mapping for unit enums
//!
//! Queue records are logged and matched by short lowercase names
//! (`location_update`, `patch`, ...). [`impl_wire_name!`] maps each variant to
//! one name and derives `as_str`, `Display` and a case-insensitive `FromStr`
//! from that single table.
//!
//! ```rust
//! use waypoint_domain::impl_wire_name;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum DeliveryState {
//!     Assigned,
//!     PickedUp,
//!     Delivered,
//! }
//!
//! impl_wire_name!(DeliveryState {
//!     Assigned => "assigned",
//!     PickedUp => "picked_up",
//!     Delivered => "delivered",
//! });
//!
//! assert_eq!(DeliveryState::PickedUp.as_str(), "picked_up");
//! assert_eq!("DELIVERED".parse::<DeliveryState>(), Ok(DeliveryState::Delivered));
//! ```

/// Derive `as_str`, `Display` and `FromStr` for a unit enum from a
/// variant-to-name table.
///
/// Parsing ignores ASCII case; an unknown name yields an error message naming
/// the enum.
#[macro_export]
macro_rules! impl_wire_name {
    ($enum_name:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Short lowercase name of the variant.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| format!("unknown {} {s:?}", stringify!($enum_name)))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Lane {
        Bike,
        Bus,
    }

    impl_wire_name!(Lane {
        Bike => "bike",
        Bus => "bus_only",
    });

    #[test]
    fn every_variant_round_trips_through_its_name() {
        for lane in Lane::ALL {
            assert_eq!(lane.to_string().parse::<Lane>(), Ok(*lane));
        }
    }

    #[test]
    fn unknown_names_are_reported() {
        assert_eq!("tram".parse::<Lane>(), Err("unknown Lane \"tram\"".to_string()));
        assert_eq!("BUS_ONLY".parse::<Lane>(), Ok(Lane::Bus));
    }
}
