use prettytable::{row, Row};

use super::table::ToRow;
use crate::api::NeighborSummary;

const EMPTY_VALUE: &str = "";

fn maybe_string(item: Option<&String>) -> &str {
    item.map(String::as_str).unwrap_or(EMPTY_VALUE)
}

/// ASNs above 65535 are shown in asdot notation (E.g. 65000.100)
fn asn_to_dotted(asn: &str) -> String {
    match asn.parse::<u32>() {
        Ok(asn) if asn > u32::from(u16::MAX) => format!("{}.{}", asn >> 16, asn & 0xffff),
        _ => asn.to_string(),
    }
}

pub struct NeighborSummaryRow(pub NeighborSummary);

impl ToRow for NeighborSummaryRow {
    fn columns() -> Row {
        row![
            "Neighbor",
            "Description",
            "Router ID",
            "Local Address",
            "Local AS",
            "Peer AS"
        ]
    }

    fn to_row(&self) -> Row {
        let neighbor = &self.0;
        row![
            neighbor.address.to_string(),
            maybe_string(neighbor.description.as_ref()),
            maybe_string(neighbor.router_id.as_ref()),
            maybe_string(neighbor.local_address.as_ref()),
            neighbor
                .local_as
                .as_deref()
                .map(asn_to_dotted)
                .unwrap_or_default(),
            neighbor
                .peer_as
                .as_deref()
                .map(asn_to_dotted)
                .unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asn_to_dotted() {
        assert_eq!(asn_to_dotted("65010"), "65010");
        assert_eq!(asn_to_dotted("4259840100"), "65000.100");
        assert_eq!(asn_to_dotted("not-a-number"), "not-a-number");
    }

    #[test]
    fn test_neighbor_row() {
        let row = NeighborSummaryRow(NeighborSummary {
            address: "10.0.0.1".parse().unwrap(),
            description: Some("edge".to_string()),
            router_id: None,
            local_address: None,
            local_as: None,
            peer_as: Some("65010".to_string()),
        })
        .to_row();
        assert_eq!(row.len(), 6);
        assert_eq!(row.get_cell(0).unwrap().get_content(), "10.0.0.1");
        assert_eq!(row.get_cell(1).unwrap().get_content(), "edge");
        assert_eq!(row.get_cell(5).unwrap().get_content(), "65010");
    }
}
