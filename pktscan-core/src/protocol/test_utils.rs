//! Test utilities for scan routines.
//!
//! Builders for constructing test packets. Checksums are left zero; the
//! scanner never looks at them.

/// Builder for constructing Ethernet frames.
#[derive(Debug, Clone)]
pub struct EthernetBuilder {
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    ethertype: u16,
    payload: Vec<u8>,
}

impl Default for EthernetBuilder {
    fn default() -> Self {
        Self {
            src_mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            dst_mac: [0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            ethertype: 0x0800, // IPv4
            payload: Vec::new(),
        }
    }
}

impl EthernetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_mac(mut self, mac: [u8; 6]) -> Self {
        self.src_mac = mac;
        self
    }

    pub fn dst_mac(mut self, mac: [u8; 6]) -> Self {
        self.dst_mac = mac;
        self
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.ethertype = ethertype;
        self
    }

    pub fn ipv6(self) -> Self {
        self.ethertype(0x86DD)
    }

    pub fn vlan(self) -> Self {
        self.ethertype(0x8100)
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(14 + self.payload.len());
        frame.extend_from_slice(&self.dst_mac);
        frame.extend_from_slice(&self.src_mac);
        frame.extend_from_slice(&self.ethertype.to_be_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }
}

/// 802.1Q tag: TCI followed by the inner ethertype.
pub fn vlan_tag(vlan_id: u16, inner_ethertype: u16) -> Vec<u8> {
    let mut tag = Vec::with_capacity(4);
    tag.extend_from_slice(&(vlan_id & 0x0fff).to_be_bytes());
    tag.extend_from_slice(&inner_ethertype.to_be_bytes());
    tag
}

/// Builder for constructing IPv4 headers.
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    flags_fragment: u16,
    protocol: u8,
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    options: Vec<u8>,
    total_length: Option<u16>,
    payload: Vec<u8>,
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self {
            flags_fragment: 0x0000,
            protocol: 6, // TCP
            src_ip: [192, 168, 1, 1],
            dst_ip: [192, 168, 1, 2],
            options: Vec::new(),
            total_length: None,
            payload: Vec::new(),
        }
    }
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn tcp(self) -> Self {
        self.protocol(6)
    }

    pub fn udp(self) -> Self {
        self.protocol(17)
    }

    pub fn icmp(self) -> Self {
        self.protocol(1)
    }

    pub fn src_ip(mut self, ip: [u8; 4]) -> Self {
        self.src_ip = ip;
        self
    }

    pub fn dst_ip(mut self, ip: [u8; 4]) -> Self {
        self.dst_ip = ip;
        self
    }

    /// Raw flags + fragment offset word.
    pub fn flags_fragment(mut self, value: u16) -> Self {
        self.flags_fragment = value;
        self
    }

    /// Option bytes; padded to a multiple of four with end-of-list.
    pub fn options(mut self, options: Vec<u8>) -> Self {
        self.options = options;
        self
    }

    /// Force the total length field instead of computing it.
    pub fn total_length(mut self, value: u16) -> Self {
        self.total_length = Some(value);
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        while self.options.len() % 4 != 0 {
            self.options.push(0);
        }
        let header_len = 20 + self.options.len();
        let total_length = self
            .total_length
            .unwrap_or((header_len + self.payload.len()) as u16);
        let mut header = Vec::with_capacity(header_len + self.payload.len());

        header.push(0x40 | (header_len / 4) as u8);
        header.push(0x00); // DSCP/ECN
        header.extend_from_slice(&total_length.to_be_bytes());
        header.extend_from_slice(&[0x00, 0x01]); // Identification
        header.extend_from_slice(&self.flags_fragment.to_be_bytes());
        header.push(64); // TTL
        header.push(self.protocol);
        header.extend_from_slice(&[0x00, 0x00]); // Checksum
        header.extend_from_slice(&self.src_ip);
        header.extend_from_slice(&self.dst_ip);
        header.extend_from_slice(&self.options);
        header.extend_from_slice(&self.payload);

        header
    }
}

/// Builder for constructing IPv6 headers with optional extension headers.
#[derive(Debug, Clone)]
pub struct Ipv6Builder {
    next_header: u8,
    src_ip: [u8; 16],
    dst_ip: [u8; 16],
    extensions: Vec<u8>,
    payload: Vec<u8>,
}

impl Default for Ipv6Builder {
    fn default() -> Self {
        let mut src_ip = [0u8; 16];
        src_ip[0] = 0xfe;
        src_ip[1] = 0x80;
        src_ip[15] = 1;
        let mut dst_ip = src_ip;
        dst_ip[15] = 2;
        Self {
            next_header: 6,
            src_ip,
            dst_ip,
            extensions: Vec::new(),
            payload: Vec::new(),
        }
    }
}

impl Ipv6Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next header value in the fixed header.
    pub fn next_header(mut self, value: u8) -> Self {
        self.next_header = value;
        self
    }

    pub fn src_ip(mut self, ip: [u8; 16]) -> Self {
        self.src_ip = ip;
        self
    }

    pub fn dst_ip(mut self, ip: [u8; 16]) -> Self {
        self.dst_ip = ip;
        self
    }

    /// Raw extension header bytes placed after the fixed header.
    pub fn extensions(mut self, bytes: Vec<u8>) -> Self {
        self.extensions = bytes;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let payload_len = (self.extensions.len() + self.payload.len()) as u16;
        let mut header = Vec::with_capacity(40 + payload_len as usize);
        header.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
        header.extend_from_slice(&payload_len.to_be_bytes());
        header.push(self.next_header);
        header.push(64); // Hop limit
        header.extend_from_slice(&self.src_ip);
        header.extend_from_slice(&self.dst_ip);
        header.extend_from_slice(&self.extensions);
        header.extend_from_slice(&self.payload);
        header
    }
}

/// Generic 8-byte extension header (hop-by-hop, routing, destination).
pub fn ipv6_extension(next_header: u8) -> Vec<u8> {
    vec![next_header, 0, 0, 0, 0, 0, 0, 0]
}

/// IPv6 fragment extension header.
pub fn ipv6_fragment(next_header: u8, offset: u16, more: bool) -> Vec<u8> {
    let word = (offset << 3) | u16::from(more);
    let mut ext = vec![next_header, 0];
    ext.extend_from_slice(&word.to_be_bytes());
    ext.extend_from_slice(&[0, 0, 0, 1]);
    ext
}

/// Builder for constructing TCP headers.
#[derive(Debug, Clone)]
pub struct TcpBuilder {
    src_port: u16,
    dst_port: u16,
    flags: u8,
    options: Vec<u8>,
    payload: Vec<u8>,
}

impl Default for TcpBuilder {
    fn default() -> Self {
        Self {
            src_port: 12345,
            dst_port: 443,
            flags: 0x02, // SYN
            options: Vec::new(),
            payload: Vec::new(),
        }
    }
}

impl TcpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn psh_ack(mut self) -> Self {
        self.flags = 0x18;
        self
    }

    /// Option bytes; padded to a multiple of four with end-of-list.
    pub fn options(mut self, options: Vec<u8>) -> Self {
        self.options = options;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        while self.options.len() % 4 != 0 {
            self.options.push(0);
        }
        let data_offset = ((20 + self.options.len()) / 4) as u8;
        let mut header = Vec::with_capacity(20 + self.options.len() + self.payload.len());

        header.extend_from_slice(&self.src_port.to_be_bytes());
        header.extend_from_slice(&self.dst_port.to_be_bytes());
        header.extend_from_slice(&1u32.to_be_bytes()); // Sequence
        header.extend_from_slice(&0u32.to_be_bytes()); // Acknowledgement
        header.push(data_offset << 4);
        header.push(self.flags);
        header.extend_from_slice(&65535u16.to_be_bytes()); // Window
        header.extend_from_slice(&[0x00, 0x00]); // Checksum
        header.extend_from_slice(&[0x00, 0x00]); // Urgent pointer
        header.extend_from_slice(&self.options);
        header.extend_from_slice(&self.payload);

        header
    }
}

/// Builder for constructing UDP headers.
#[derive(Debug, Clone)]
pub struct UdpBuilder {
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
}

impl Default for UdpBuilder {
    fn default() -> Self {
        Self {
            src_port: 12345,
            dst_port: 53,
            payload: Vec::new(),
        }
    }
}

impl UdpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let length = 8 + self.payload.len() as u16;
        let mut header = Vec::with_capacity(8 + self.payload.len());

        header.extend_from_slice(&self.src_port.to_be_bytes());
        header.extend_from_slice(&self.dst_port.to_be_bytes());
        header.extend_from_slice(&length.to_be_bytes());
        header.extend_from_slice(&[0x00, 0x00]); // Checksum
        header.extend_from_slice(&self.payload);

        header
    }
}

/// Minimal RTP header: version 2, given payload type, optional CSRCs.
pub fn rtp_header(payload_type: u8, csrc_count: u8) -> Vec<u8> {
    let mut header = vec![0x80 | (csrc_count & 0x0f), payload_type & 0x7f];
    header.extend_from_slice(&1u16.to_be_bytes()); // Sequence
    header.extend_from_slice(&160u32.to_be_bytes()); // Timestamp
    header.extend_from_slice(&0x1234_5678u32.to_be_bytes()); // SSRC
    for i in 0..csrc_count {
        header.extend_from_slice(&u32::from(i).to_be_bytes());
    }
    header
}

/// Build a complete Ethernet/IPv4/TCP packet.
pub fn build_tcp_packet(
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
) -> Vec<u8> {
    let tcp = TcpBuilder::new()
        .src_port(src_port)
        .dst_port(dst_port)
        .psh_ack()
        .payload(payload)
        .build();

    let ipv4 = Ipv4Builder::new()
        .src_ip(src_ip)
        .dst_ip(dst_ip)
        .tcp()
        .payload(tcp)
        .build();

    EthernetBuilder::new().payload(ipv4).build()
}

/// Build a complete Ethernet/IPv4/UDP packet.
pub fn build_udp_packet(
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
) -> Vec<u8> {
    let udp = UdpBuilder::new()
        .src_port(src_port)
        .dst_port(dst_port)
        .payload(payload)
        .build();

    let ipv4 = Ipv4Builder::new()
        .src_ip(src_ip)
        .dst_ip(dst_ip)
        .udp()
        .payload(udp)
        .build();

    EthernetBuilder::new().payload(ipv4).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethernet_builder() {
        let frame = EthernetBuilder::new()
            .src_mac([0x11, 0x22, 0x33, 0x44, 0x55, 0x66])
            .dst_mac([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff])
            .ethertype(0x0800)
            .payload(vec![0x45, 0x00])
            .build();

        assert_eq!(frame.len(), 16);
        assert_eq!(&frame[0..6], &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]); // dst
        assert_eq!(&frame[6..12], &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]); // src
        assert_eq!(&frame[12..14], &[0x08, 0x00]);
    }

    #[test]
    fn test_ipv4_builder_pads_options() {
        let packet = Ipv4Builder::new().options(vec![0x01, 0x01, 0x01]).build();
        assert_eq!(packet.len(), 24);
        assert_eq!(packet[0], 0x46);
        assert_eq!(&packet[2..4], &24u16.to_be_bytes());
    }

    #[test]
    fn test_tcp_builder_data_offset() {
        let segment = TcpBuilder::new().options(vec![0x02, 0x04, 0x05, 0xb4]).build();
        assert_eq!(segment.len(), 24);
        assert_eq!(segment[12] >> 4, 6);
    }

    #[test]
    fn test_build_tcp_packet() {
        let packet = build_tcp_packet([10, 0, 0, 1], [10, 0, 0, 2], 40000, 80, vec![0; 100]);
        assert_eq!(packet.len(), 154);
    }

    #[test]
    fn test_ipv6_builder_payload_length() {
        let packet = Ipv6Builder::new()
            .next_header(0)
            .extensions(ipv6_extension(17))
            .payload(vec![0; 8])
            .build();
        assert_eq!(packet.len(), 56);
        assert_eq!(&packet[4..6], &16u16.to_be_bytes());
    }
}
