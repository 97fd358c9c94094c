//! Built-in datagram kinds carried in header byte 6.
//!
//! Kinds 0-15 are reserved for the protocol itself.
//! Kinds 16-255 are available for application-defined use.

/// Keep-alive probe, carries no body.
pub const HEARTBEAT: u8 = 0;

/// Request or response routed by the MVC layer.
pub const MVC: u8 = 1;

/// Acknowledgement of a previously received datagram id.
pub const ACK: u8 = 2;

/// First application-defined kind.
pub const USER_KIND_START: u8 = 16;

/// Returns a human-readable name for a datagram kind.
pub fn kind_name(kind: u8) -> &'static str {
    match kind {
        HEARTBEAT => "HEARTBEAT",
        MVC => "MVC",
        ACK => "ACK",
        3..=15 => "RESERVED",
        _ => "USER",
    }
}

/// Returns true if the kind is in the application-defined range.
pub fn is_user(kind: u8) -> bool {
    kind >= USER_KIND_START
}
