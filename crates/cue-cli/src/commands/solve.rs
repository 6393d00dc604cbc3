use anyhow::{Context, Result};
use cue_physics::{solve_quartic, C64};

pub fn solve(a: f64, b: f64, c: f64, d: f64, e: f64) -> Result<()> {
    let roots = solve_quartic(a, b, c, d, e).context("Failed to solve the quartic")?;
    for root in roots {
        println!("{}", format_root(root));
    }
    Ok(())
}

fn format_root(root: C64) -> String {
    if root.im == 0.0 {
        format!("{:.6}", root.re)
    } else {
        let sign = if root.im < 0.0 { '-' } else { '+' };
        format!("{:.6} {} {:.6}i", root.re, sign, root.im.abs())
    }
}
