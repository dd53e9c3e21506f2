//! Built-in transforms.
//!
//! Small, cheap transforms used to exercise graphs end to end. Real
//! processing steps are registered by the application.

use std::sync::Arc;

use tg_core::{ParamValue, Rect};

use crate::configuration::ResolvedConfig;
use crate::error::{TransformError, TransformResult};
use crate::raster::RasterInfo;
use crate::transform::{FnTransformFactory, SourceImages, SourceTiles, TargetTile, Transform, TransformFactory};

const DEFAULT_EXTENT: u32 = 512;

/// Factories of every built-in transform.
pub fn factories() -> Vec<Arc<dyn TransformFactory>> {
    vec![
        Arc::new(
            FnTransformFactory::new("Constant", |config, _| Ok(Box::new(ConstantTransform::from_config(config)?)))
                .with_description("Raster filled with a single value"),
        ),
        Arc::new(
            FnTransformFactory::new("Ramp", |config, _| Ok(Box::new(RampTransform::from_config(config)?)))
                .with_description("Raster whose samples count pixels in row-major order"),
        ),
        Arc::new(
            FnTransformFactory::new("Scale", |config, sources| {
                Ok(Box::new(ScaleTransform::from_config(config, sources)?))
            })
            .with_description("Linear rescaling: factor * source + offset"),
        ),
        Arc::new(
            FnTransformFactory::new("Sum", |_, sources| Ok(Box::new(SumTransform::from_sources(sources)?)))
                .with_description("Pixel-wise sum of all sources"),
        ),
        Arc::new(
            FnTransformFactory::new("Threshold", |config, sources| {
                Ok(Box::new(ThresholdTransform::from_config(config, sources)?))
            })
            .with_description("Binary mask and masked source at a threshold"),
        ),
    ]
}

/// Constant raster; all channels of a tile are produced together.
#[derive(Debug, Clone)]
pub struct ConstantTransform {
    bounds: Rect,
    bands: usize,
    value: f64,
}

impl ConstantTransform {
    pub fn new(width: u32, height: u32, value: f64) -> Self {
        Self {
            bounds: Rect::from_size(width, height),
            bands: 1,
            value,
        }
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    pub fn from_config(config: &ResolvedConfig) -> TransformResult<Self> {
        let bounds = Rect::new(
            config.u32_or("x", 0)?,
            config.u32_or("y", 0)?,
            config.u32_or("width", DEFAULT_EXTENT)?,
            config.u32_or("height", DEFAULT_EXTENT)?,
        );
        let bands = config.u32_or("bands", 1)? as usize;
        if bands == 0 {
            return Err(TransformError::InvalidParameter {
                name: "bands".into(),
                reason: "at least one band is required".into(),
            });
        }
        Ok(Self {
            bounds,
            bands,
            value: config.f64_or("value", 0.0)?,
        })
    }
}

impl Transform for ConstantTransform {
    fn initialize(&mut self) -> TransformResult<Vec<RasterInfo>> {
        Ok(vec![
            RasterInfo::new("constant", self.bounds.width, self.bounds.height)
                .with_bounds(self.bounds)
                .with_channel_count(self.bands),
        ])
    }

    fn target_property(&self, name: &str) -> Option<ParamValue> {
        match name {
            "value" => Some(ParamValue::Float(self.value)),
            "width" => Some(ParamValue::Int(self.bounds.width.into())),
            "height" => Some(ParamValue::Int(self.bounds.height.into())),
            _ => None,
        }
    }

    fn target_property_names(&self) -> Vec<String> {
        vec!["value".into(), "width".into(), "height".into()]
    }

    fn can_compute_tile_stack(&self) -> bool {
        true
    }

    fn compute_tile(&self, target: &TargetTile, _sources: &SourceTiles<'_>) -> TransformResult<Vec<f32>> {
        Ok(vec![self.value as f32; target.region.area()])
    }

    fn compute_tile_stack(
        &self,
        _output: usize,
        channels: usize,
        region: Rect,
        _sources: &SourceTiles<'_>,
    ) -> TransformResult<Vec<Vec<f32>>> {
        Ok(vec![vec![self.value as f32; region.area()]; channels])
    }
}

/// Single-band raster where each sample is its row-major pixel number.
#[derive(Debug, Clone)]
pub struct RampTransform {
    bounds: Rect,
}

impl RampTransform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bounds: Rect::from_size(width, height),
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> TransformResult<Self> {
        Ok(Self::new(
            config.u32_or("width", DEFAULT_EXTENT)?,
            config.u32_or("height", DEFAULT_EXTENT)?,
        ))
    }
}

impl Transform for RampTransform {
    fn initialize(&mut self) -> TransformResult<Vec<RasterInfo>> {
        Ok(vec![RasterInfo::new("ramp", self.bounds.width, self.bounds.height)])
    }

    fn compute_tile(&self, target: &TargetTile, _sources: &SourceTiles<'_>) -> TransformResult<Vec<f32>> {
        let region = target.region;
        let width = self.bounds.width as u64;
        let mut samples = Vec::with_capacity(region.area());
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                samples.push((y as u64 * width + x as u64) as f32);
            }
        }
        Ok(samples)
    }
}

/// `factor * source + offset`, channel by channel.
#[derive(Debug, Clone)]
pub struct ScaleTransform {
    info: RasterInfo,
    factor: f64,
    offset: f64,
}

impl ScaleTransform {
    pub fn from_config(config: &ResolvedConfig, sources: &SourceImages) -> TransformResult<Self> {
        let source = sources.first().ok_or_else(|| TransformError::MissingSource {
            role: "source".into(),
        })?;
        let mut info = source.info().clone();
        info.name = "scaled".into();
        Ok(Self {
            info,
            factor: config.f64_or("factor", 1.0)?,
            offset: config.f64_or("offset", 0.0)?,
        })
    }
}

impl Transform for ScaleTransform {
    fn initialize(&mut self) -> TransformResult<Vec<RasterInfo>> {
        Ok(vec![self.info.clone()])
    }

    fn target_property(&self, name: &str) -> Option<ParamValue> {
        match name {
            "factor" => Some(ParamValue::Float(self.factor)),
            "offset" => Some(ParamValue::Float(self.offset)),
            _ => None,
        }
    }

    fn target_property_names(&self) -> Vec<String> {
        vec!["factor".into(), "offset".into()]
    }

    fn compute_tile(&self, target: &TargetTile, sources: &SourceTiles<'_>) -> TransformResult<Vec<f32>> {
        let tile = sources.tile_at(0, target.channel, target.region)?;
        let (factor, offset) = (self.factor as f32, self.offset as f32);
        Ok(tile.into_samples().into_iter().map(|v| v * factor + offset).collect())
    }
}

/// Pixel-wise sum over every bound source.
#[derive(Debug, Clone)]
pub struct SumTransform {
    info: RasterInfo,
    inputs: usize,
}

impl SumTransform {
    pub fn from_sources(sources: &SourceImages) -> TransformResult<Self> {
        let first = sources.first().ok_or_else(|| TransformError::MissingSource {
            role: "source".into(),
        })?;
        let channels = first.channel_count();
        let mut bounds = first.bounds();
        for bound in sources.iter() {
            if bound.image.channel_count() != channels {
                return Err(TransformError::IncompatibleSources {
                    reason: format!(
                        "'{}' has {} channels, '{}' has {channels}",
                        bound.role,
                        bound.image.channel_count(),
                        first.producer()
                    ),
                });
            }
            bounds = bounds.union(&bound.image.bounds());
        }
        let info = RasterInfo::new("sum", bounds.width, bounds.height)
            .with_bounds(bounds)
            .with_channels(first.info().channels.clone());
        Ok(Self {
            info,
            inputs: sources.len(),
        })
    }
}

impl Transform for SumTransform {
    fn initialize(&mut self) -> TransformResult<Vec<RasterInfo>> {
        Ok(vec![self.info.clone()])
    }

    fn compute_tile(&self, target: &TargetTile, sources: &SourceTiles<'_>) -> TransformResult<Vec<f32>> {
        let mut acc = vec![0.0_f32; target.region.area()];
        for index in 0..self.inputs {
            let tile = sources.tile_at(index, target.channel, target.region)?;
            for (a, v) in acc.iter_mut().zip(tile.samples()) {
                *a += v;
            }
        }
        Ok(acc)
    }
}

/// Two outputs: `mask` (1 where the source reaches the threshold, else 0)
/// and `masked` (the source where it reaches the threshold, else 0).
#[derive(Debug, Clone)]
pub struct ThresholdTransform {
    source: RasterInfo,
    threshold: f64,
}

impl ThresholdTransform {
    pub const MASK: usize = 0;
    pub const MASKED: usize = 1;

    pub fn from_config(config: &ResolvedConfig, sources: &SourceImages) -> TransformResult<Self> {
        let source = sources.first().ok_or_else(|| TransformError::MissingSource {
            role: "source".into(),
        })?;
        Ok(Self {
            source: source.info().clone(),
            threshold: config.f64("threshold")?,
        })
    }
}

impl Transform for ThresholdTransform {
    fn initialize(&mut self) -> TransformResult<Vec<RasterInfo>> {
        let mut mask = self.source.clone();
        mask.name = "mask".into();
        let mut masked = self.source.clone();
        masked.name = "masked".into();
        Ok(vec![mask, masked])
    }

    fn target_property(&self, name: &str) -> Option<ParamValue> {
        (name == "threshold").then_some(ParamValue::Float(self.threshold))
    }

    fn target_property_names(&self) -> Vec<String> {
        vec!["threshold".into()]
    }

    fn compute_tile(&self, target: &TargetTile, sources: &SourceTiles<'_>) -> TransformResult<Vec<f32>> {
        let tile = sources.tile_at(0, target.channel, target.region)?;
        let threshold = self.threshold as f32;
        let samples = tile.into_samples().into_iter();
        let out = match target.output {
            Self::MASK => samples.map(|v| if v >= threshold { 1.0 } else { 0.0 }).collect(),
            Self::MASKED => samples.map(|v| if v >= threshold { v } else { 0.0 }).collect(),
            other => return Err(TransformError::failed(format!("no output #{other}"))),
        };
        Ok(out)
    }
}
