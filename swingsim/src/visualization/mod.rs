pub mod swing_vis3d;
