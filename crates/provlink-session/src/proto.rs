//! Wire envelope for session establishment.
//!
//! Hand-derived prost messages. Field numbers are fixed by the device
//! firmware's protobuf schema and must not change.

/// Allowed values of the security scheme tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SecSchemeVersion {
    SecScheme0 = 0,
    SecScheme1 = 1,
    SecScheme2 = 2,
}

/// Status codes reported by the device inside handshake responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Status {
    Success = 0,
    InvalidSecScheme = 1,
    InvalidProto = 2,
    TooManySessions = 3,
    InvalidArgument = 4,
    InternalError = 5,
    CryptoError = 6,
    InvalidSession = 7,
}

/// Top-level envelope carried on the session endpoint.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionData {
    #[prost(enumeration = "SecSchemeVersion", tag = "2")]
    pub sec_ver: i32,
    #[prost(oneof = "session_data::Proto", tags = "10, 11, 12")]
    pub proto: Option<session_data::Proto>,
}

pub mod session_data {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Proto {
        #[prost(message, tag = "10")]
        Sec0(super::Sec0Payload),
        #[prost(message, tag = "11")]
        Sec1(super::Sec1Payload),
        #[prost(message, tag = "12")]
        Sec2(super::Sec2Payload),
    }
}

// ---------------------------------------------------------------------------
// Scheme 0 (unsecured)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Sec0MsgType {
    S0SessionCommand = 0,
    S0SessionResponse = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sec0Payload {
    #[prost(enumeration = "Sec0MsgType", tag = "1")]
    pub msg: i32,
    #[prost(oneof = "sec0_payload::Payload", tags = "20, 21")]
    pub payload: Option<sec0_payload::Payload>,
}

pub mod sec0_payload {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "20")]
        Sc(super::S0SessionCmd),
        #[prost(message, tag = "21")]
        Sr(super::S0SessionResp),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct S0SessionCmd {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct S0SessionResp {
    #[prost(enumeration = "Status", tag = "1")]
    pub status: i32,
}

// ---------------------------------------------------------------------------
// Scheme 1 (key agreement)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Sec1MsgType {
    SessionCommand0 = 0,
    SessionResponse0 = 1,
    SessionCommand1 = 2,
    SessionResponse1 = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sec1Payload {
    #[prost(enumeration = "Sec1MsgType", tag = "1")]
    pub msg: i32,
    #[prost(oneof = "sec1_payload::Payload", tags = "20, 21, 22, 23")]
    pub payload: Option<sec1_payload::Payload>,
}

pub mod sec1_payload {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "20")]
        Sc0(super::SessionCmd0),
        #[prost(message, tag = "21")]
        Sr0(super::SessionResp0),
        #[prost(message, tag = "22")]
        Sc1(super::SessionCmd1),
        #[prost(message, tag = "23")]
        Sr1(super::SessionResp1),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionCmd0 {
    #[prost(bytes = "vec", tag = "1")]
    pub client_pubkey: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionResp0 {
    #[prost(enumeration = "Status", tag = "1")]
    pub status: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub device_pubkey: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub device_random: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionCmd1 {
    #[prost(bytes = "vec", tag = "2")]
    pub client_verify_data: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionResp1 {
    #[prost(enumeration = "Status", tag = "1")]
    pub status: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub device_verify_data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Scheme 2 (password authentication)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Sec2MsgType {
    S2SessionCommand0 = 0,
    S2SessionResponse0 = 1,
    S2SessionCommand1 = 2,
    S2SessionResponse1 = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sec2Payload {
    #[prost(enumeration = "Sec2MsgType", tag = "1")]
    pub msg: i32,
    #[prost(oneof = "sec2_payload::Payload", tags = "20, 21, 22, 23")]
    pub payload: Option<sec2_payload::Payload>,
}

pub mod sec2_payload {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "20")]
        Sc0(super::S2SessionCmd0),
        #[prost(message, tag = "21")]
        Sr0(super::S2SessionResp0),
        #[prost(message, tag = "22")]
        Sc1(super::S2SessionCmd1),
        #[prost(message, tag = "23")]
        Sr1(super::S2SessionResp1),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct S2SessionCmd0 {
    #[prost(bytes = "vec", tag = "1")]
    pub client_username: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub client_pubkey: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct S2SessionResp0 {
    #[prost(enumeration = "Status", tag = "1")]
    pub status: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub device_pubkey: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub device_salt: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct S2SessionCmd1 {
    #[prost(bytes = "vec", tag = "1")]
    pub client_proof: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct S2SessionResp1 {
    #[prost(enumeration = "Status", tag = "1")]
    pub status: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub device_proof: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub device_nonce: Vec<u8>,
}
