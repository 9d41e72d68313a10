use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("facility already exists")]
    ErrFacilityExists,
    #[error("facility does not exist")]
    ErrFacilityNotFound,
    #[error("facility has existing bookings")]
    ErrFacilityHasBookings,

    #[error("unable to insert booking due to clashes")]
    ErrBookingConflict,
    #[error("booking with specified id not found")]
    ErrBookingNotFound,
    #[error("invalid configuration for booking")]
    ErrInvalidBooking,

    #[error("request payload too short")]
    ErrPayloadTooShort,
    #[error("request payload is not valid utf-8")]
    ErrPayloadNotUtf8,
    #[error("request payload has wrong size")]
    ErrPayloadSize,
    #[error("unknown method identifier {method:#04x}")]
    ErrUnknownMethod { method: u8 },
}
