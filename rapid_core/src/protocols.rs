//! Built-in protocol checklists for each emergency kind.
//!
//! The labels are opaque to the engine; they only seed an emergency's
//! `required_actions` when a response begins.

use crate::EmergencyKind;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Canonical checklist for one kind of emergency
#[derive(Clone, Debug)]
pub struct Protocol {
    pub kind: EmergencyKind,
    pub title: &'static str,
    pub required_actions: Vec<&'static str>,
}

impl Protocol {
    pub fn checklist(&self) -> Vec<String> {
        self.required_actions.iter().map(|a| a.to_string()).collect()
    }
}

pub const CALL_CODE_BLUE: &str = "Call Code Blue";
pub const START_CPR: &str = "Start CPR";
pub const GET_CRASH_CART: &str = "Get Crash Cart/AED";

static PROTOCOLS: Lazy<HashMap<EmergencyKind, Protocol>> = Lazy::new(|| {
    let protocols = [
        Protocol {
            kind: EmergencyKind::CodeBlue,
            title: "Code Blue",
            required_actions: vec![
                CALL_CODE_BLUE,
                START_CPR,
                GET_CRASH_CART,
                "Secure Airway",
                "IV Access",
                "Epinephrine 1mg",
            ],
        },
        Protocol {
            kind: EmergencyKind::CodeStroke,
            title: "Code Stroke",
            required_actions: vec![
                "Call Code Stroke",
                "Last Known Well",
                "Fingerstick Glucose",
                "NIHSS",
                "CT Head",
                "Thrombolysis Decision",
            ],
        },
        Protocol {
            kind: EmergencyKind::CodeWhite,
            title: "Code White",
            required_actions: vec![
                "Call Code White",
                "Ensure Staff Safety",
                "Verbal De-escalation",
                "Notify Attending",
            ],
        },
        Protocol {
            kind: EmergencyKind::RapidResponse,
            title: "Rapid Response",
            required_actions: vec![
                "Call RRT",
                "Full Set of Vitals",
                "Oxygen",
                "IV Access",
                "Notify Attending",
                "Disposition",
            ],
        },
    ];

    protocols.into_iter().map(|p| (p.kind, p)).collect()
});

/// Look up the built-in protocol for an emergency kind
pub fn protocol_for(kind: EmergencyKind) -> &'static Protocol {
    // Every kind is populated above
    &PROTOCOLS[&kind]
}
