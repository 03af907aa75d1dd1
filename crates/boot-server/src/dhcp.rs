//! DHCP responder
//!
//! Answers PXE-class DHCP requests for MAC addresses holding an active
//! boot lease. The reply carries the next-server address and the
//! bootloader filename; address assignment is left to the site's real
//! DHCP server. MACs without a lease get no offer at all, so unrelated
//! hardware can never be directed into a reinstall.

use crate::error::BootError;
use crate::lease::LeaseTable;
use dhcproto::v4::{DhcpOption, Message, MessageType, Opcode, OptionCode};
use dhcproto::{Decodable, Decoder, Encodable, Encoder};
use host_model::mac::mac_from_bytes;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// PXE clients announce themselves with this vendor class prefix.
const PXE_CLIENT_PREFIX: &[u8] = b"PXEClient";

/// DHCP client port, replies go here when the source is unspecified.
const DHCP_CLIENT_PORT: u16 = 68;

/// PXE-aware DHCP responder bound to one UDP socket.
#[derive(Debug)]
pub struct DhcpResponder {
    socket: UdpSocket,
    table: LeaseTable,
    next_server: Ipv4Addr,
    bootfile: String,
}

impl DhcpResponder {
    /// Bind the responder socket. Bind failure is fatal to service startup.
    pub async fn bind(
        addr: SocketAddr,
        table: LeaseTable,
        next_server: Ipv4Addr,
        bootfile: String,
    ) -> Result<Self, BootError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| BootError::Dhcp(format!("failed to bind {addr}: {e}")))?;
        socket
            .set_broadcast(true)
            .map_err(|e| BootError::Dhcp(e.to_string()))?;

        Ok(Self {
            socket,
            table,
            next_server,
            bootfile,
        })
    }

    /// Address the responder socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, BootError> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive loop. Malformed or non-PXE datagrams are dropped, never
    /// answered, and never terminate the loop; transient receive errors
    /// are logged and the loop keeps going.
    pub async fn serve(self) -> Result<(), BootError> {
        info!(addr = %self.socket.local_addr()?, "DHCP responder listening");
        let mut buf = vec![0u8; 1500];

        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(err) => {
                    warn!(error = %err, "DHCP receive failed");
                    continue;
                }
            };

            let Some(reply) =
                handle_frame(&buf[..len], &self.table, self.next_server, &self.bootfile).await
            else {
                continue;
            };

            let dest = if peer.ip().is_unspecified() {
                SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), DHCP_CLIENT_PORT)
            } else {
                peer
            };
            if let Err(err) = self.socket.send_to(&reply, dest).await {
                warn!(%dest, error = %err, "failed to send DHCP reply");
            }
        }
    }
}

/// Inspect one datagram and produce the encoded reply, if any.
///
/// Replies are only produced for well-formed DISCOVER/REQUEST messages
/// that carry the PXE vendor class and whose MAC has an active lease.
pub(crate) async fn handle_frame(
    data: &[u8],
    table: &LeaseTable,
    next_server: Ipv4Addr,
    bootfile: &str,
) -> Option<Vec<u8>> {
    let msg = match Message::decode(&mut Decoder::new(data)) {
        Ok(msg) => msg,
        Err(err) => {
            debug!(error = %err, "ignoring malformed DHCP datagram");
            return None;
        }
    };

    if msg.opcode() != Opcode::BootRequest {
        return None;
    }

    let reply_type = match msg.opts().msg_type() {
        Some(MessageType::Discover) => MessageType::Offer,
        Some(MessageType::Request) => MessageType::Ack,
        _ => return None,
    };

    let is_pxe = matches!(
        msg.opts().get(OptionCode::ClassIdentifier),
        Some(DhcpOption::ClassIdentifier(id)) if id.starts_with(PXE_CLIENT_PREFIX)
    );
    if !is_pxe {
        return None;
    }

    let chaddr = msg.chaddr();
    if chaddr.len() < 6 {
        debug!("ignoring PXE request with short hardware address");
        return None;
    }
    let mac = mac_from_bytes(&chaddr[..6])?;

    // No lease, no offer: this MAC is not being provisioned right now
    let lease = match table.lookup(&mac).await {
        Some(lease) => lease,
        None => {
            debug!(%mac, "PXE request for MAC without an active lease, ignoring");
            return None;
        }
    };

    info!(%mac, hostname = %lease.hostname, ?reply_type, "answering PXE request");

    let mut reply = Message::default();
    reply
        .set_opcode(Opcode::BootReply)
        .set_xid(msg.xid())
        .set_flags(msg.flags())
        .set_chaddr(&chaddr[..6])
        .set_siaddr(next_server)
        .set_fname_str(bootfile);
    reply
        .opts_mut()
        .insert(DhcpOption::MessageType(reply_type));
    reply
        .opts_mut()
        .insert(DhcpOption::ServerIdentifier(next_server));
    reply
        .opts_mut()
        .insert(DhcpOption::ClassIdentifier(PXE_CLIENT_PREFIX.to_vec()));

    let mut out = Vec::new();
    if let Err(err) = reply.encode(&mut Encoder::new(&mut out)) {
        warn!(%mac, error = %err, "failed to encode DHCP reply");
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::BootLease;
    use chrono::{Duration, Utc};
    use host_model::{DiskLayout, ImageSpec, OsSpec};

    const MAC_BYTES: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01];
    const NEXT_SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    fn lease(mac: &str) -> BootLease {
        BootLease {
            mac: mac.to_string(),
            hostname: "h1".to_string(),
            kernel: "vmlinuz".to_string(),
            initrd: "initrd.img".to_string(),
            cmdline: "console=ttyS0".to_string(),
            config_url: "http://10.0.0.1:8080/v1/boot/aa:bb:cc:dd:ee:01/config".to_string(),
            os: OsSpec {
                os_type: String::new(),
                version: String::new(),
                source: String::new(),
                root_password: String::new(),
                ssh_keys: vec![],
                image: ImageSpec {
                    kernel: "vmlinuz".to_string(),
                    initrd: "initrd.img".to_string(),
                    cmdline: String::new(),
                },
                disk: DiskLayout {
                    device: "/dev/sda".to_string(),
                    filesystem: "ext4".to_string(),
                    use_lvm: false,
                    partition_scheme: None,
                    partitions: vec![],
                },
                network: Default::default(),
                packages: vec![],
                pre_install: vec![],
                post_install: vec![],
            },
            expires_at: Utc::now() + Duration::minutes(30),
        }
    }

    fn pxe_request(msg_type: MessageType, vendor_class: Option<&[u8]>) -> Vec<u8> {
        let mut msg = Message::default();
        msg.set_opcode(Opcode::BootRequest)
            .set_xid(0x1234_5678)
            .set_chaddr(&MAC_BYTES);
        msg.opts_mut().insert(DhcpOption::MessageType(msg_type));
        if let Some(class) = vendor_class {
            msg.opts_mut()
                .insert(DhcpOption::ClassIdentifier(class.to_vec()));
        }

        let mut buf = Vec::new();
        msg.encode(&mut Encoder::new(&mut buf)).unwrap();
        buf
    }

    #[tokio::test]
    async fn test_pxe_discover_with_lease_gets_offer() {
        let table = LeaseTable::new();
        table.insert(lease("aa:bb:cc:dd:ee:01")).await;

        let frame = pxe_request(MessageType::Discover, Some(b"PXEClient:Arch:00007"));
        let reply = handle_frame(&frame, &table, NEXT_SERVER, "pxelinux.0")
            .await
            .expect("expected an offer");

        let decoded = Message::decode(&mut Decoder::new(&reply)).unwrap();
        assert_eq!(decoded.opcode(), Opcode::BootReply);
        assert_eq!(decoded.opts().msg_type(), Some(MessageType::Offer));
        assert_eq!(decoded.siaddr(), NEXT_SERVER);
        assert_eq!(decoded.xid(), 0x1234_5678);
        assert_eq!(&decoded.chaddr()[..6], &MAC_BYTES);
    }

    #[tokio::test]
    async fn test_pxe_request_with_lease_gets_ack() {
        let table = LeaseTable::new();
        table.insert(lease("aa:bb:cc:dd:ee:01")).await;

        let frame = pxe_request(MessageType::Request, Some(b"PXEClient:Arch:00007"));
        let reply = handle_frame(&frame, &table, NEXT_SERVER, "pxelinux.0")
            .await
            .expect("expected an ack");

        let decoded = Message::decode(&mut Decoder::new(&reply)).unwrap();
        assert_eq!(decoded.opts().msg_type(), Some(MessageType::Ack));
    }

    #[tokio::test]
    async fn test_pxe_request_without_lease_is_ignored() {
        let table = LeaseTable::new();

        let frame = pxe_request(MessageType::Discover, Some(b"PXEClient:Arch:00007"));
        assert!(handle_frame(&frame, &table, NEXT_SERVER, "pxelinux.0")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_non_pxe_request_is_ignored_even_with_lease() {
        let table = LeaseTable::new();
        table.insert(lease("aa:bb:cc:dd:ee:01")).await;

        let frame = pxe_request(MessageType::Discover, None);
        assert!(handle_frame(&frame, &table, NEXT_SERVER, "pxelinux.0")
            .await
            .is_none());

        let frame = pxe_request(MessageType::Discover, Some(b"MSFT 5.0"));
        assert!(handle_frame(&frame, &table, NEXT_SERVER, "pxelinux.0")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_serve_outlives_garbage_datagrams() {
        let table = LeaseTable::new();
        table.insert(lease("aa:bb:cc:dd:ee:01")).await;

        let responder = DhcpResponder::bind(
            "127.0.0.1:0".parse().unwrap(),
            table,
            NEXT_SERVER,
            "pxelinux.0".to_string(),
        )
        .await
        .unwrap();
        let addr = responder.local_addr().unwrap();
        let _serve = tokio::spawn(responder.serve());

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        // Garbage first; the loop must drop it and keep listening
        client.send_to(&[0xde, 0xad, 0xbe], addr).await.unwrap();
        let frame = pxe_request(MessageType::Discover, Some(b"PXEClient:Arch:00007"));
        client.send_to(&frame, addr).await.unwrap();

        let mut buf = vec![0u8; 1500];
        let (len, _) = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.recv_from(&mut buf),
        )
        .await
        .expect("no reply after garbage datagram")
        .unwrap();

        let decoded = Message::decode(&mut Decoder::new(&buf[..len])).unwrap();
        assert_eq!(decoded.opcode(), Opcode::BootReply);
        assert_eq!(decoded.opts().msg_type(), Some(MessageType::Offer));
    }

    #[tokio::test]
    async fn test_malformed_frame_is_ignored() {
        let table = LeaseTable::new();
        table.insert(lease("aa:bb:cc:dd:ee:01")).await;

        assert!(handle_frame(&[0x01, 0x02, 0x03], &table, NEXT_SERVER, "pxelinux.0")
            .await
            .is_none());
        assert!(handle_frame(&[], &table, NEXT_SERVER, "pxelinux.0")
            .await
            .is_none());
    }
}
