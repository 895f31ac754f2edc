use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::models::{labels, Link};

/// IPv4 address with its prefix length, as assigned to one side of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkIp {
    pub addr: Ipv4Addr,
    pub prefix_len: u8,
}

impl LinkIp {
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Self {
        Self { addr, prefix_len }
    }

    fn mask(&self) -> u32 {
        if self.prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix_len as u32)
        }
    }

    /// Address of the peer on a point-to-point prefix.
    ///
    /// /31: the other address of the pair. /30 and shorter: the next host
    /// address, or the previous one when the next is the broadcast address.
    pub fn far_end(&self) -> Result<LinkIp, String> {
        let addr = u32::from(self.addr);
        match self.prefix_len {
            32 => Err(format!("no far end address for {}", self)),
            31 => Ok(LinkIp::new(Ipv4Addr::from(addr ^ 1), 31)),
            _ => {
                let network = addr & self.mask();
                let broadcast = network | !self.mask();
                if addr == network || addr == broadcast {
                    return Err(format!("{} is not a host address", self));
                }
                let peer = if addr + 1 == broadcast { addr - 1 } else { addr + 1 };
                if peer == network {
                    return Err(format!("no far end address for {}", self));
                }
                Ok(LinkIp::new(Ipv4Addr::from(peer), self.prefix_len))
            }
        }
    }
}

impl fmt::Display for LinkIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for LinkIp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| format!("{:?} is not in address/prefix form", s))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|e| format!("invalid IPv4 address {:?}: {}", addr, e))?;
        let prefix_len: u8 = len
            .parse()
            .ok()
            .filter(|l| *l <= 32)
            .ok_or_else(|| format!("invalid prefix length {:?}", len))?;
        Ok(LinkIp::new(addr, prefix_len))
    }
}

/// Assigns the addresses of both ends of a link
pub trait LinkAddressing: Send + Sync {
    /// Addresses for endpoint A and endpoint B, in that order
    fn link_ips(&self, link: &Link) -> Result<(LinkIp, LinkIp), String>;
}

/// Derives link addresses from the link's `ip` label, or from the system IPs of
/// both nodes when the link has none.
///
/// Without an explicit address the link gets `1.<lo>.<hi>.<n>/31`, where lo/hi
/// are the lower/higher last octet of the two system IPs and n is 0 when A holds
/// the lower octet, 1 otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIpAddressing;

impl LinkAddressing for SystemIpAddressing {
    fn link_ips(&self, link: &Link) -> Result<(LinkIp, LinkIp), String> {
        let ip_a = match link.labels.get(labels::LINK_IP) {
            Some(ip) => ip
                .parse::<LinkIp>()
                .map_err(|e| format!("invalid ip on {}: {}", link.a.iface, e))?,
            None => {
                let sys_a = system_ip(link, true)?;
                let sys_b = system_ip(link, false)?;
                let (mut o2, mut o3, mut o4) = (sys_a.addr.octets()[3], sys_b.addr.octets()[3], 0u8);
                if o3 < o2 {
                    std::mem::swap(&mut o2, &mut o3);
                    o4 += 1;
                }
                LinkIp::new(Ipv4Addr::new(1, o2, o3, o4), 31)
            }
        };
        let ip_b = ip_a.far_end()?;
        Ok((ip_a, ip_b))
    }
}

fn system_ip(link: &Link, side_a: bool) -> Result<LinkIp, String> {
    let node = if side_a { &link.a.node } else { &link.b.node };
    node.label(labels::SYSTEM_IP).parse().map_err(|e| {
        format!(
            "no '{}' on link & the '{}' of {}: {}",
            labels::LINK_IP,
            labels::SYSTEM_IP,
            node.short_name,
            e
        )
    })
}
