//! # Confidence — Resultado de Inferência e Combinação de Evidências
//!
//! Uma consulta `infer(d, r, t)` devolve um [`Inference`]:
//!
//! - `Known(c)` — confiança `c ∈ [0, 1]` de que a relação vale;
//! - `Unknown` — **ausência de evidência** (nenhuma regra disparou).
//!
//! `Unknown` é distinto de `Known(0.0)`: zero significa "sabemos que não".
//!
//! ## Combinador de Evidências
//!
//! O [`Evidence`] acumula os resultados por regra:
//!
//! ```text
//! regra de suporte com confiança r:   support    ← support    × (1 − r)
//! regra de refutação com confiança r: scepticism ← scepticism × (1 − r)
//!
//! houve suporte     → (1 − support) × scepticism
//! só refutação      → scepticism
//! nada disparou     → Unknown
//! ```
//!
//! A assimetria é intencional e testável: uma regra de refutação sozinha
//! nunca leva a confiança acima do seu fator de ceticismo.
//!
//! O produto é comutativo — a ordem das regras não altera o resultado.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Resultado de uma consulta de inferência.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "confidence", rename_all = "snake_case")]
pub enum Inference {
    Known(f64),
    Unknown,
}

impl Inference {
    /// Confiança, se conhecida.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            Inference::Known(c) => Some(*c),
            Inference::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Inference::Known(_))
    }

    /// Confiança ou um valor padrão para `Unknown`.
    pub fn unwrap_or(&self, default: f64) -> f64 {
        self.confidence().unwrap_or(default)
    }
}

/// Formato `⟨0.80⟩` ou `⟨?⟩`.
impl fmt::Display for Inference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inference::Known(c) => write!(f, "⟨{:.2}⟩", c),
            Inference::Unknown => write!(f, "⟨?⟩"),
        }
    }
}

/// Acumulador de evidências de suporte e refutação.
#[derive(Clone, Debug)]
pub struct Evidence {
    support: f64,
    scepticism: f64,
    any_support: bool,
    any_oppose: bool,
}

impl Evidence {
    pub fn new() -> Self {
        Self {
            support: 1.0,
            scepticism: 1.0,
            any_support: false,
            any_oppose: false,
        }
    }

    /// Registra o resultado `r` de uma regra.
    pub fn add(&mut self, r: f64, supporting: bool) {
        let r = r.clamp(0.0, 1.0);
        if supporting {
            self.support *= 1.0 - r;
            self.any_support = true;
        } else {
            self.scepticism *= 1.0 - r;
            self.any_oppose = true;
        }
    }

    /// Combina tudo o que foi acumulado.
    pub fn conclude(&self) -> Inference {
        if self.any_support {
            Inference::Known((1.0 - self.support) * self.scepticism)
        } else if self.any_oppose {
            Inference::Known(self.scepticism)
        } else {
            Inference::Unknown
        }
    }
}

impl Default for Evidence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rules_is_unknown() {
        assert_eq!(Evidence::new().conclude(), Inference::Unknown);
    }

    /// Duas regras de suporte independentes se reforçam
    #[test]
    fn supporting_rules_combine_noisy_or() {
        let mut e = Evidence::new();
        e.add(0.5, true);
        e.add(0.5, true);
        assert!((e.conclude().unwrap_or(0.0) - 0.75).abs() < 1e-9);
    }

    /// Refutação reduz a confiança de suporte proporcionalmente
    #[test]
    fn refuting_rule_scales_support_down() {
        let mut e = Evidence::new();
        e.add(0.6, true);
        e.add(0.69, false);
        assert!((e.conclude().unwrap_or(0.0) - 0.6 * 0.31).abs() < 1e-9);
    }

    #[test]
    fn lone_refutation_returns_scepticism() {
        let mut e = Evidence::new();
        e.add(0.25, false);
        assert_eq!(e.conclude(), Inference::Known(0.75));
    }

    #[test]
    fn order_does_not_matter() {
        let mut a = Evidence::new();
        a.add(0.3, true);
        a.add(0.2, false);
        a.add(0.9, true);
        let mut b = Evidence::new();
        b.add(0.9, true);
        b.add(0.3, true);
        b.add(0.2, false);
        let (x, y) = (a.conclude().unwrap_or(0.0), b.conclude().unwrap_or(0.0));
        assert!((x - y).abs() < 1e-12);
    }

    #[test]
    fn display() {
        assert_eq!(Inference::Known(0.8).to_string(), "⟨0.80⟩");
        assert_eq!(Inference::Unknown.to_string(), "⟨?⟩");
    }
}
