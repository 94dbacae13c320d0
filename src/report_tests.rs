// File: report_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#[cfg(test)]
mod tests {
    use crate::porttest::{PortCheck, PortCheckKind};
    use crate::report::*;
    use chrono::Utc;
    use serde_json::Value;

    fn create_test_report() -> NetworkReport {
        let lan = |port| PortCheck {
            host: "192.168.1.10".to_string(),
            port,
            kind: PortCheckKind::Lan,
        };
        NetworkReport {
            stable_public_dns_name: "home.ddns.example.net".to_string(),
            stable_public_ip: "203.0.113.7".parse().unwrap(),
            gateway_public_ip: "203.0.113.8".parse().unwrap(),
            lan_ip: "192.168.1.10".parse().unwrap(),
            gateway_lan_ip: "192.168.1.1".parse().unwrap(),
            default_interface: "eth0".to_string(),
            parent_dns_domain: "example.com".to_string(),
            dns_checks: vec![DnsCheck {
                hostname: "hub.example.com".to_string(),
                address: "203.0.113.7".parse().unwrap(),
            }],
            port_checks: vec![
                lan(80),
                lan(7080),
                PortCheck {
                    host: "203.0.113.7".to_string(),
                    port: 80,
                    kind: PortCheckKind::Forwarded {
                        lan_host: "192.168.1.10".to_string(),
                        lan_port: 7080,
                    },
                },
            ],
            warnings: vec!["Gateway's public IP address differs".to_string()],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    fn render(format: ReportFormat) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        ReportGenerator::generate_report(&create_test_report(), &mut out, format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_report_lists_every_path() {
        let text = render(ReportFormat::Text);

        assert!(text.contains("[hub.example.com] all resolve to 203.0.113.7"));
        assert!(text.contains("Ports [80, 7080] are all available for use."));
        assert!(text.contains("Port forwarding from 203.0.113.7:80 to 192.168.1.10:7080 is working."));
        assert!(text.contains("Gateway LAN IP address: 192.168.1.1"));
        assert!(text.contains("Gateway's public IP address differs"));
        assert!(!text.contains("}"));
    }

    #[test]
    fn test_json_report() {
        let json: Value = serde_json::from_str(&render(ReportFormat::Json)).unwrap();

        assert_eq!(json["stable_public_ip"], "203.0.113.7");
        assert_eq!(json["port_checks"].as_array().unwrap().len(), 3);
        assert_eq!(json["port_checks"][0]["kind"], "lan");
        assert_eq!(json["port_checks"][2]["kind"], "forwarded");
        assert_eq!(json["port_checks"][2]["lan_port"], 7080);
        assert_eq!(json["dns_checks"][0]["hostname"], "hub.example.com");
    }

    #[test]
    fn test_lan_ports_skip_forwarded_checks() {
        assert_eq!(create_test_report().lan_ports(), vec![80, 7080]);
    }
}
