use crate::error::NjError;
use crate::tree::{Cluster, PhyloTree};
use num_traits::Float;
use std::io::Write;

/// Significant digits written for every branch length.
const BRANCH_LENGTH_DIGITS: i32 = 8;

/// Tracks where we are up to while writing out the description of an
/// internal cluster.
struct Place {
    cluster: usize,
    link_number: usize,
}

/// Writes `tree` as a Newick expression terminated by `;` and a newline,
/// using an explicit stack rather than recursion. The traversal is capped
/// at three visits per cluster; exceeding the cap means the cluster arena
/// describes a cycle, which should never happen.
pub(crate) fn write_tree<T: Float, W: Write>(
    tree: &PhyloTree<T>,
    out: &mut W,
) -> Result<(), NjError> {
    if tree.is_empty() {
        return Err(NjError::InternalInvariant(String::from(
            "attempted to serialize an empty tree",
        )));
    }
    let mut remaining = 3 * tree.clusters.len();
    let mut stack = vec![Place {
        cluster: tree.clusters.len() - 1,
        link_number: 0,
    }];
    while let Some(here) = stack.pop() {
        if remaining == 0 {
            return Err(NjError::InternalInvariant(String::from(
                "cycle detected while serializing the cluster forest",
            )));
        }
        remaining -= 1;
        match &tree.clusters[here.cluster] {
            Cluster::Leaf { name } => {
                out.write_all(name.as_bytes())?;
            }
            Cluster::Internal { links } => {
                if here.link_number == 0 {
                    out.write_all(b"(")?;
                    stack.push(Place {
                        cluster: here.cluster,
                        link_number: 1,
                    });
                    stack.push(Place {
                        cluster: links[0].child as usize,
                        link_number: 0,
                    });
                    continue;
                }
                let prev = &links[here.link_number - 1];
                write!(out, ":{}", significant(prev.length, BRANCH_LENGTH_DIGITS))?;
                if here.link_number < links.len() {
                    out.write_all(b",")?;
                    stack.push(Place {
                        cluster: here.cluster,
                        link_number: here.link_number + 1,
                    });
                    stack.push(Place {
                        cluster: links[here.link_number].child as usize,
                        link_number: 0,
                    });
                } else {
                    out.write_all(b")")?;
                }
            }
        }
    }
    out.write_all(b";\n")?;
    Ok(())
}

/// Renders a branch length rounded to `digits` significant digits.
fn significant<T: Float>(length: T, digits: i32) -> String {
    let value = length.to_f64().expect("Invalid float");
    if value == 0.0 || !value.is_finite() {
        return String::from("0");
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits - 1 - magnitude);
    format!("{}", (value * factor).round() / factor)
}
