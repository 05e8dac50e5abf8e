//! MCTP message types as assigned by DMTF DSP0239.
//!
//! The first byte of every MCTP message carries the message type in its low 7 bits. The top
//! bit is the integrity-check flag, which is not part of the type.

use crate::utils::encoded_type;

encoded_type!(
    /// The type of a complete MCTP message, selecting the upper-layer handler.
    pub enum MessageType(u8) {
        /// MCTP control messages.
        Control = 0x00,
        /// Platform Level Data Model.
        Pldm = 0x01,
        /// NC-SI over MCTP.
        NcSi = 0x02,
        /// Ethernet over MCTP.
        Ethernet = 0x03,
        /// NVM Express Management Messages over MCTP.
        NvmeMi = 0x04,
        /// Security Protocol and Data Model.
        Spdm = 0x05,
        /// Secured messages using SPDM.
        SecuredMessage = 0x06,
        /// CXL Fabric Manager API.
        CxlFmApi = 0x07,
        /// CXL Component Command Interface.
        CxlCci = 0x08,
        /// Vendor defined, identified by a PCI vendor ID.
        VendorDefinedPci = 0x7e,
        /// Vendor defined, identified by an IANA enterprise number.
        VendorDefinedIana = 0x7f;
        /// A message type without an assignment in this library.
        Unassigned = 0x09..=u8::MAX,
    }
);

impl MessageType {
    /// Mask selecting the message type from the first message byte.
    pub const TYPE_MASK: u8 = 0x7f;

    /// Mask selecting the integrity-check bit from the first message byte.
    pub const INTEGRITY_CHECK_MASK: u8 = 0x80;

    /// Returns the message type carried in the first byte of a message.
    pub fn from_type_byte(byte: u8) -> Self {
        Self::from(byte & Self::TYPE_MASK)
    }

    /// Returns true if the first byte of a message signals a trailing integrity check.
    pub fn integrity_check(byte: u8) -> bool {
        byte & Self::INTEGRITY_CHECK_MASK != 0
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04x}", u8::from(*self))
    }
}

#[cfg(test)]
mod tests {
    use test_utils::param_test;

    use super::*;

    param_test! {
        from_type_byte: [
            control: (0x00, MessageType::Control),
            pldm: (0x01, MessageType::Pldm),
            spdm_with_integrity_check: (0x85, MessageType::Spdm),
            vendor_iana: (0x7f, MessageType::VendorDefinedIana),
            masked_vendor_pci: (0xfe, MessageType::VendorDefinedPci),
            unassigned: (0x42, MessageType::Unassigned(0x42))
        ]
    }
    fn from_type_byte(byte: u8, expected: MessageType) {
        assert_eq!(MessageType::from_type_byte(byte), expected);
    }

    #[test]
    fn converts_back_to_code_point() {
        assert_eq!(u8::from(MessageType::CxlCci), 0x08);
        assert_eq!(u8::from(MessageType::Unassigned(0x42)), 0x42);
        assert_eq!(MessageType::from(0x7e), MessageType::VendorDefinedPci);
    }

    #[test]
    fn integrity_check_bit() {
        assert!(MessageType::integrity_check(0x81));
        assert!(!MessageType::integrity_check(0x01));
    }

    #[test]
    fn display_as_hex() {
        assert_eq!(MessageType::Pldm.to_string(), "0x01");
    }
}
