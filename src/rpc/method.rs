use std::fmt;

/// Method identifies the operation a request invokes; the first octet of
/// every request envelope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Method(pub u8);

pub const METHOD_FACILITY_CREATE: Method = Method(0x01);
pub const METHOD_FACILITY_QUERY: Method = Method(0x02);
pub const METHOD_FACILITY_MONITOR: Method = Method(0x03);
pub const METHOD_FACILITY_DELETE: Method = Method(0x04);

pub const METHOD_BOOKING_MAKE: Method = Method(0x11);
pub const METHOD_BOOKING_UPDATE: Method = Method(0x12);
pub const METHOD_BOOKING_DELETE: Method = Method(0x13);

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            METHOD_FACILITY_CREATE => "FacilityCreate",
            METHOD_FACILITY_QUERY => "FacilityQuery",
            METHOD_FACILITY_MONITOR => "FacilityMonitor",
            METHOD_FACILITY_DELETE => "FacilityDelete",
            METHOD_BOOKING_MAKE => "BookingMake",
            METHOD_BOOKING_UPDATE => "BookingUpdate",
            METHOD_BOOKING_DELETE => "BookingDelete",
            _ => return write!(f, "UnknownMethod({:#04x})", self.0),
        };
        write!(f, "{s}")
    }
}
