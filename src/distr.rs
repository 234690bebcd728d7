//! Distributions to draw branch lengths from when generating random trees
//!

use std::fmt::{Debug, Display};

use clap::ValueEnum;
use num_traits::{Float, Zero};
use numeric_literals::replace_numeric_literals;
use rand_distr::{uniform::SampleUniform, Distribution, Exp, Gamma, Uniform};
use trait_set::trait_set;

trait_set! {
    /// Trait describing objects that can be used as branch lengths
    /// in phylogenetic trees.
    pub trait BranchLength = Debug + Display + Float + Zero + SampleUniform;
}

/// Available branch length distributions
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Distr {
    /// A uniform distribution over $[0.001, 1.0)$
    Uniform,
    /// An exponential distribution with rate $\lambda=10$
    /// (mean branch length $0.1$)
    Exponential,
    /// A gamma distribution with shape $k=2$ and scale $\theta=0.1$
    Gamma,
}

impl Distr {
    /// Build a sampler for this distribution
    #[replace_numeric_literals(T::from(literal).unwrap())]
    pub(crate) fn sampler<T>(self) -> Sampler<T>
    where
        T: BranchLength,
        rand_distr::StandardNormal: rand_distr::Distribution<T>,
        rand_distr::Exp1: rand_distr::Distribution<T>,
        rand_distr::Open01: rand_distr::Distribution<T>,
    {
        match self {
            Distr::Uniform => Sampler::Uniform(Uniform::new(0.001, 1.0)),
            Distr::Exponential => Sampler::Exponential(Exp::new(10.0).unwrap()),
            Distr::Gamma => Sampler::Gamma(Gamma::new(2.0, 0.1).unwrap()),
        }
    }
}

pub(crate) enum Sampler<T>
where
    T: BranchLength,
    rand_distr::StandardNormal: rand_distr::Distribution<T>,
    rand_distr::Exp1: rand_distr::Distribution<T>,
    rand_distr::Open01: rand_distr::Distribution<T>,
{
    Uniform(Uniform<T>),
    Exponential(Exp<T>),
    Gamma(Gamma<T>),
}

impl<T> Distribution<T> for Sampler<T>
where
    T: BranchLength,
    rand_distr::StandardNormal: rand_distr::Distribution<T>,
    rand_distr::Exp1: rand_distr::Distribution<T>,
    rand_distr::Open01: rand_distr::Distribution<T>,
{
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> T {
        match self {
            Sampler::Uniform(distr) => distr.sample(rng),
            Sampler::Exponential(distr) => distr.sample(rng),
            Sampler::Gamma(distr) => distr.sample(rng),
        }
    }
}
