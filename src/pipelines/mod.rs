// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ ColorFrame   │ ──▶ │  color            │ ──▶ │  JPEG/PNG file   │
//! │ (BGRA/RGBA)  │     │  - 4ch → RGB      │     │                  │
//! │              │     │  - encode         │     │                  │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ DepthFrame   │ ──▶ │  point_cloud      │ ──▶ │  raw f32 XYZ     │
//! │ (u16 raster) │     │  - (x, y, d)      │     │  (.npy, no hdr)  │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//! ```
//!
//! Both pipelines keep their working buffers between frames and run on the
//! recording thread.

pub mod color;
pub mod point_cloud;
