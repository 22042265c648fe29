//! Static GPU pricing reference data
//!
//! Hourly on-demand rates per provider and GPU type.

use serde::Serialize;

use crate::models::Provider;

/// Capacity availability of a GPU type at a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::High => write!(f, "high"),
            Availability::Medium => write!(f, "medium"),
            Availability::Low => write!(f, "low"),
        }
    }
}

/// One row of the pricing table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuPricing {
    pub provider: Provider,
    pub gpu_type: &'static str,
    pub price_per_hour: f64,
    pub memory: &'static str,
    pub compute_capability: &'static str,
    pub availability: Availability,
}

const fn row(
    provider: Provider,
    gpu_type: &'static str,
    price_per_hour: f64,
    memory: &'static str,
    compute_capability: &'static str,
    availability: Availability,
) -> GpuPricing {
    GpuPricing {
        provider,
        gpu_type,
        price_per_hour,
        memory,
        compute_capability,
        availability,
    }
}

pub const GPU_PRICING: &[GpuPricing] = &[
    row(Provider::Aws, "H100 80GB", 8.10, "80GB HBM3", "989 TFLOPS", Availability::Low),
    row(Provider::Gcp, "H100 80GB", 7.85, "80GB HBM3", "989 TFLOPS", Availability::Low),
    row(Provider::Azure, "H100 80GB", 8.45, "80GB HBM3", "989 TFLOPS", Availability::Medium),
    row(Provider::Aws, "A100 80GB", 4.10, "80GB HBM2e", "312 TFLOPS", Availability::High),
    row(Provider::Gcp, "A100 80GB", 3.93, "80GB HBM2e", "312 TFLOPS", Availability::High),
    row(Provider::Azure, "A100 80GB", 4.25, "80GB HBM2e", "312 TFLOPS", Availability::High),
    row(Provider::Aws, "A100 40GB", 3.06, "40GB HBM2e", "312 TFLOPS", Availability::High),
    row(Provider::Gcp, "A100 40GB", 2.93, "40GB HBM2e", "312 TFLOPS", Availability::High),
    row(Provider::Aws, "L4 24GB", 1.12, "24GB GDDR6", "121 TFLOPS", Availability::High),
    row(Provider::Gcp, "L4 24GB", 0.95, "24GB GDDR6", "121 TFLOPS", Availability::High),
    row(Provider::Aws, "A10G 24GB", 1.51, "24GB GDDR6", "125 TFLOPS", Availability::High),
    row(Provider::Azure, "A10 24GB", 1.48, "24GB GDDR6", "125 TFLOPS", Availability::High),
    row(Provider::Aws, "V100 32GB", 3.06, "32GB HBM2", "125 TFLOPS", Availability::Medium),
    row(Provider::Gcp, "V100 16GB", 2.48, "16GB HBM2", "125 TFLOPS", Availability::Medium),
];

/// Hourly price of a GPU at a provider, or 0 when the pair is not offered
pub fn gpu_price(gpu_type: &str, provider: Provider) -> f64 {
    GPU_PRICING
        .iter()
        .find(|p| p.gpu_type == gpu_type && p.provider == provider)
        .map(|p| p.price_per_hour)
        .unwrap_or(0.0)
}

pub fn gpus_by_provider(provider: Provider) -> Vec<&'static GpuPricing> {
    GPU_PRICING.iter().filter(|p| p.provider == provider).collect()
}

/// Distinct GPU types in table order
pub fn all_gpu_types() -> Vec<&'static str> {
    let mut types: Vec<&'static str> = Vec::new();
    for pricing in GPU_PRICING {
        if !types.contains(&pricing.gpu_type) {
            types.push(pricing.gpu_type);
        }
    }
    types
}

/// Lowest-priced offering of a GPU type across providers
pub fn cheapest_for(gpu_type: &str) -> Option<&'static GpuPricing> {
    GPU_PRICING
        .iter()
        .filter(|p| p.gpu_type == gpu_type)
        .min_by(|a, b| a.price_per_hour.total_cmp(&b.price_per_hour))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_price_lookup() {
        assert_eq!(gpu_price("H100 80GB", Provider::Gcp), 7.85);
        assert_eq!(gpu_price("A100 40GB", Provider::Aws), 3.06);
    }

    #[test]
    fn test_gpu_price_unknown_pair_is_zero() {
        assert_eq!(gpu_price("A100 40GB", Provider::Azure), 0.0);
        assert_eq!(gpu_price("TPU v5", Provider::Gcp), 0.0);
    }

    #[test]
    fn test_gpus_by_provider() {
        let azure = gpus_by_provider(Provider::Azure);
        assert_eq!(azure.len(), 3);
        assert!(azure.iter().all(|p| p.provider == Provider::Azure));
    }

    #[test]
    fn test_all_gpu_types_deduplicated_in_order() {
        let types = all_gpu_types();
        assert_eq!(types.len(), 8);
        assert_eq!(types[0], "H100 80GB");
        assert_eq!(types[1], "A100 80GB");
        assert_eq!(*types.last().unwrap(), "V100 16GB");
    }

    #[test]
    fn test_cheapest_for() {
        let cheapest = cheapest_for("L4 24GB").unwrap();
        assert_eq!(cheapest.provider, Provider::Gcp);
        assert!(cheapest_for("B200").is_none());
    }
}
