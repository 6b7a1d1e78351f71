// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thresholds and timeouts used to fill in gesture declarations.

/// Thresholds and timeouts for gesture recognition.
///
/// Distances are in logical pixels, durations in milliseconds.
/// [`GestureDeclaration::from_config`](crate::GestureDeclaration::from_config) and the
/// built-in recognizers take their defaults from here.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureConfig {
    /// Maximum travel of a tap or long-press finger before the gesture is rejected (default: 10).
    pub tap_slop: f64,
    /// Window between taps of a multi-tap sequence (default: 300ms).
    pub multi_tap_timeout: u64,
    /// Hold time before a long press is recognized (default: 500ms).
    pub long_press_duration: u64,
    /// Minimum travel before a pan is recognized (default: 5).
    pub pan_distance: f64,
    /// Minimum travel before a drag is recognized (default: 10).
    pub drag_distance: f64,
    /// Minimum change of finger span before a pinch is recognized (default: 5).
    pub pinch_distance: f64,
    /// Minimum rotation in degrees before a rotation is recognized (default: 1).
    pub rotate_angle: f64,
    /// Minimum release speed in pixels per second for a swipe (default: 100).
    pub swipe_speed: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_slop: 10.0,
            multi_tap_timeout: 300,
            long_press_duration: 500,
            pan_distance: 5.0,
            drag_distance: 10.0,
            pinch_distance: 5.0,
            rotate_angle: 1.0,
            swipe_speed: 100.0,
        }
    }
}
