//! Property-based tests for chain strings.
//!
//! Printing and parsing must agree: clauses survive a display/parse cycle
//! exactly, and a chain printed, parsed and printed again is unchanged.

use catena_config::{Clause, Registry, parse_chain, parse_clauses};
use proptest::prelude::*;

fn keyword() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,4}".prop_filter("reserved keyword", |k| {
        !matches!(k.as_str(), "kx" | "pn" | "pf")
    })
}

fn clause() -> impl Strategy<Value = (String, Vec<f32>)> {
    (
        keyword(),
        prop::collection::vec(-1.0e6f32..1.0e6, 0..6),
    )
}

/// Operator clauses with values each operator stores as given.
fn operator_clause() -> impl Strategy<Value = String> {
    prop_oneof![
        (0.0f32..400.0).prop_map(|v| format!("-ea:{v}")),
        (20.0f32..20000.0).prop_map(|v| format!("-efl:{v}")),
        (0.0f32..100.0).prop_map(|v| format!("-epp:{v}")),
        (0.0f32..100.0, 0.0f32..100.0).prop_map(|(a, b)| format!("-ec:{a},{b}")),
        (1.0f32..1000.0, 1usize..8, 0.0f32..100.0)
            .prop_map(|(ms, n, mix)| format!("-etm:{ms},{n},{mix}")),
    ]
}

/// Controller clauses with integral param-id and free range and source
/// values.
fn controller_clause() -> impl Strategy<Value = String> {
    prop_oneof![
        (1usize..3, -10.0f32..10.0, 0.0f32..5.0, 0.0f32..2.0)
            .prop_map(|(id, lo, f, p)| format!("-kos:{id},{lo},{},{f},{p}", lo + 1.0)),
        (1usize..3, 0.1f32..10.0).prop_map(|(id, len)| format!("-kl:{id},0,1,{len}")),
        (1usize..3, 0.0f32..3.0, 0.1f32..3.0)
            .prop_map(|(id, a, b)| format!("-kl2:{id},0,100,{a},{b}")),
    ]
}

/// Nesting depths in depth-first order: each at most one deeper than the
/// one before, starting at the top level.
fn depths() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..4, 0..6).prop_map(|raw| {
        let mut out: Vec<usize> = Vec::with_capacity(raw.len());
        for r in raw {
            let limit = out.last().map_or(0, |d| d + 1);
            out.push(r.min(limit));
        }
        out
    })
}

fn chain_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        (
            operator_clause(),
            depths().prop_flat_map(|d| {
                prop::collection::vec(controller_clause(), d.len())
                    .prop_map(move |c| (d.clone(), c))
            }),
        ),
        1..4,
    )
    .prop_map(|ops| {
        let mut parts = Vec::new();
        for (op, (depths, controllers)) in ops {
            parts.push(op);
            for (depth, ctrl) in depths.into_iter().zip(controllers) {
                parts.extend(std::iter::repeat_n("-kx".to_string(), depth));
                parts.push(ctrl);
            }
        }
        parts.join(" ")
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Displayed clauses parse back to the same keywords and values.
    #[test]
    fn clauses_survive_display(clauses in prop::collection::vec(clause(), 0..8)) {
        let text = clauses
            .iter()
            .map(|(k, v)| {
                Clause::Object { pos: 0, keyword: k.clone(), values: v.clone() }.to_string()
            })
            .collect::<Vec<_>>()
            .join(" ");
        let parsed = parse_clauses(&text);
        prop_assert!(parsed.is_ok(), "{text}: {parsed:?}");
        let parsed = parsed.unwrap_or_default();
        prop_assert_eq!(parsed.len(), clauses.len());
        for (got, (keyword, values)) in parsed.iter().zip(&clauses) {
            match got {
                Clause::Object { keyword: k, values: v, .. } => {
                    prop_assert_eq!(k, keyword);
                    prop_assert_eq!(v, values);
                }
                other => prop_assert!(false, "unexpected clause {other:?}"),
            }
        }
    }

    /// Built chains print exactly the string they were parsed from.
    #[test]
    fn chain_string_round_trip(text in chain_text()) {
        let registry = Registry::new();
        let chain = parse_chain(&text, &registry);
        prop_assert!(chain.is_ok(), "{text}: {:?}", chain.as_ref().err());
        if let Ok(chain) = chain {
            prop_assert_eq!(chain.to_string(), text);
        }
    }

    /// Arbitrary input never panics the clause parser.
    #[test]
    fn parser_never_panics(text in "\\PC{0,40}") {
        let _ = parse_clauses(&text);
    }
}
