//! Retargeting an action onto a new target.

use crate::curve::Action;
use crate::error::AnimError;
use crate::path::{BoneRef, Channel, DataPath};
use nalgebra::{Matrix3, Quaternion, Vector3};
use rigkit_math::{Quat, WarningSink};
use rigkit_skeleton::{Bone, Skeleton};
use std::f64::consts::FRAC_PI_2;

/// What an action is authored against, or retargeted onto.
#[derive(Debug, Clone, Copy)]
pub enum TargetDesc<'a> {
    /// An armature target.
    Skeleton(&'a Skeleton),
    /// A camera. The engine's cameras face +Y where the host's face
    /// -Z, so rotation channels pick up a 90 degree X correction on
    /// the way in.
    Camera,
    /// Drawable geometry (UV channels).
    Drawable,
}

/// The old and new targets of one retarget pass.
#[derive(Debug, Clone, Copy)]
pub struct RetargetContext<'a> {
    /// Target the action was authored against.
    pub old: TargetDesc<'a>,
    /// Target the action is being moved onto.
    pub new: TargetDesc<'a>,
}

/// Staged changes to one curve, committed at the end of the pass.
#[derive(Default)]
struct Edit {
    path: Option<String>,
    mute: bool,
    values: Option<Vec<f64>>,
}

/// Retarget `action` in place.
///
/// Every edit is staged first and committed in one pass at the end,
/// so an error leaves the action untouched and a caller never sees a
/// half-remapped curve set. Curves that cannot be remapped are muted
/// with a warning, never deleted.
pub fn retarget<S: WarningSink>(
    action: &mut Action,
    ctx: &RetargetContext<'_>,
    sink: &mut S,
) -> Result<(), AnimError> {
    let parsed: Vec<DataPath> = action
        .curves
        .iter()
        .map(|c| DataPath::parse(&c.data_path))
        .collect();
    let mut edits: Vec<Edit> = action.curves.iter().map(|_| Edit::default()).collect();

    let old_skel = match ctx.old {
        TargetDesc::Skeleton(s) => Some(s),
        _ => None,
    };
    let new_skel = match ctx.new {
        TargetDesc::Skeleton(s) => Some(s),
        _ => None,
    };
    let old_is_camera = matches!(ctx.old, TargetDesc::Camera);
    let new_is_camera = matches!(ctx.new, TargetDesc::Camera);

    // Qualifier rewrites and mutes, one curve at a time.
    for (i, curve) in action.curves.iter().enumerate() {
        match &parsed[i] {
            DataPath::Uv => {}
            DataPath::Unrecognized => {
                sink.warning(format!(
                    "{}: unrecognized data path \"{}\"; muted",
                    action.name, curve.data_path
                ));
                edits[i].mute = true;
            }
            DataPath::Camera { .. } => {
                if !new_is_camera {
                    sink.warning(format!(
                        "{}: camera channel \"{}\" has no meaning on the new target; muted",
                        action.name, curve.data_path
                    ));
                    edits[i].mute = true;
                }
            }
            DataPath::PoseBone { bone, channel } => {
                if let Some(ns) = new_skel {
                    // Name resolves through the tag so renamed bones
                    // keep their animation; an absent tag falls back
                    // to the #<tag> spelling.
                    let tag = match bone {
                        BoneRef::Tag(t) => Some(*t),
                        BoneRef::Name(n) => old_skel
                            .and_then(|s| s.bone_by_name(n))
                            .map(|b| old_skel.unwrap().bones[b].tag),
                    };
                    match tag {
                        Some(t) => {
                            let target = match ns.bone_by_tag(t) {
                                Some(b) => BoneRef::Name(ns.bones[b].name.clone()),
                                None => BoneRef::Tag(t),
                            };
                            let path = DataPath::pose_bone(&target, *channel);
                            if path != curve.data_path {
                                edits[i].path = Some(path);
                            }
                        }
                        None => {
                            sink.warning(format!(
                                "{}: \"{}\" does not resolve on the old skeleton; muted",
                                action.name, curve.data_path
                            ));
                            edits[i].mute = true;
                        }
                    }
                } else {
                    // Camera and drawable actions are sometimes stored
                    // as pose-bone proxies; rewrite to the direct form.
                    match channel {
                        Channel::Scale => {
                            sink.warning(format!(
                                "{}: \"{}\" has no direct-form equivalent; muted",
                                action.name, curve.data_path
                            ));
                            edits[i].mute = true;
                        }
                        c => {
                            let path = c.as_str();
                            if path != curve.data_path {
                                edits[i].path = Some(path.to_string());
                            }
                        }
                    }
                }
            }
        }
    }

    // Bone-space value remaps for skeleton-to-skeleton retargets.
    if let (Some(os), Some(ns)) = (old_skel, new_skel) {
        remap_bone_values(action, &parsed, &mut edits, os, ns, sink)?;
    }

    // Camera axis correction for proxies being promoted to a camera.
    if new_is_camera && !old_is_camera {
        let correction = Quat::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2).into_inner();
        rotate_proxy_quaternions(action, &parsed, &mut edits, &correction, sink)?;
    }

    // Commit.
    for (curve, edit) in action.curves.iter_mut().zip(edits) {
        if let Some(path) = edit.path {
            curve.data_path = path;
        }
        if edit.mute {
            curve.muted = true;
        }
        if let Some(values) = edit.values {
            for (kf, v) in curve.keyframes.iter_mut().zip(values) {
                kf.value = v;
            }
        }
    }
    Ok(())
}

fn component_count(channel: Channel) -> usize {
    match channel {
        Channel::RotationQuaternion => 4,
        Channel::Location | Channel::Scale => 3,
    }
}

/// The change of bone-local space between two rests, as a 3x3 block.
fn bone_space_change(old: &Bone, new: &Bone) -> Option<Matrix3<f64>> {
    let inv = new.rest.to_transform().inverse()?;
    Some(inv.then(&old.rest.to_transform()).linear_part())
}

/// Gather the component curves of every animated (bone, channel) pair
/// and push the remapped keyframe values into `edits`.
fn remap_bone_values<S: WarningSink>(
    action: &Action,
    parsed: &[DataPath],
    edits: &mut [Edit],
    os: &Skeleton,
    ns: &Skeleton,
    sink: &mut S,
) -> Result<(), AnimError> {
    let mut groups: Vec<(u16, Channel, [Option<usize>; 4])> = Vec::new();
    for (i, curve) in action.curves.iter().enumerate() {
        if edits[i].mute {
            continue;
        }
        let DataPath::PoseBone { bone, channel } = &parsed[i] else {
            continue;
        };
        if *channel == Channel::Scale {
            continue;
        }
        let tag = match bone {
            BoneRef::Tag(t) => *t,
            BoneRef::Name(n) => match os.bone_by_name(n) {
                Some(b) => os.bones[b].tag,
                None => continue,
            },
        };
        if curve.array_index >= component_count(*channel) {
            sink.warning(format!(
                "{}: \"{}\" component index {} is out of range; muted",
                action.name, curve.data_path, curve.array_index
            ));
            edits[i].mute = true;
            continue;
        }
        let group = match groups.iter_mut().find(|(t, c, _)| *t == tag && c == channel) {
            Some(g) => g,
            None => {
                groups.push((tag, *channel, [None; 4]));
                groups.last_mut().unwrap()
            }
        };
        group.2[curve.array_index] = Some(i);
    }

    for (tag, channel, slots) in groups {
        let (Some(ob), Some(nb)) = (os.bone_by_tag(tag), ns.bone_by_tag(tag)) else {
            continue;
        };
        let (old_bone, new_bone) = (&os.bones[ob], &ns.bones[nb]);
        if old_bone.rest == new_bone.rest {
            continue;
        }
        let n = component_count(channel);
        let slots = &slots[..n];
        if slots.iter().any(|s| s.is_none()) {
            let present: Vec<usize> = slots.iter().flatten().copied().collect();
            sink.warning(format!(
                "{}: bone \"{}\" {} animates only some components; muted",
                action.name,
                old_bone.name,
                channel.as_str()
            ));
            for i in present {
                edits[i].mute = true;
            }
            continue;
        }
        let indices: Vec<usize> = slots.iter().flatten().copied().collect();
        let count = action.curves[indices[0]].keyframes.len();
        if indices
            .iter()
            .any(|&i| action.curves[i].keyframes.len() != count)
        {
            return Err(AnimError::KeyframeCountMismatch {
                bone: old_bone.name.clone(),
                channel: channel.as_str().to_string(),
            });
        }

        match channel {
            Channel::Location => {
                let Some(m) = bone_space_change(old_bone, new_bone) else {
                    sink.warning(format!(
                        "{}: bone \"{}\" has a singular rest transform; location muted",
                        action.name, new_bone.name
                    ));
                    for &i in &indices {
                        edits[i].mute = true;
                    }
                    continue;
                };
                let mut staged: Vec<Vec<f64>> = vec![Vec::with_capacity(count); 3];
                for k in 0..count {
                    let v = Vector3::new(
                        action.curves[indices[0]].keyframes[k].value,
                        action.curves[indices[1]].keyframes[k].value,
                        action.curves[indices[2]].keyframes[k].value,
                    );
                    let v = m * v;
                    for c in 0..3 {
                        staged[c].push(v[c]);
                    }
                }
                for (c, values) in staged.into_iter().enumerate() {
                    edits[indices[c]].values = Some(values);
                }
            }
            Channel::RotationQuaternion => {
                let correction =
                    (new_bone.rest.rotation.inverse() * old_bone.rest.rotation).into_inner();
                stage_quaternions(action, edits, &indices, count, |q| correction * q);
            }
            Channel::Scale => unreachable!("scale channels are never remapped"),
        }
    }
    Ok(())
}

/// Apply the camera axis correction to every pose-bone rotation proxy.
fn rotate_proxy_quaternions<S: WarningSink>(
    action: &Action,
    parsed: &[DataPath],
    edits: &mut [Edit],
    correction: &Quaternion<f64>,
    sink: &mut S,
) -> Result<(), AnimError> {
    let mut groups: Vec<(String, [Option<usize>; 4])> = Vec::new();
    for (i, curve) in action.curves.iter().enumerate() {
        if edits[i].mute {
            continue;
        }
        let DataPath::PoseBone {
            bone,
            channel: Channel::RotationQuaternion,
        } = &parsed[i]
        else {
            continue;
        };
        if curve.array_index >= 4 {
            sink.warning(format!(
                "{}: \"{}\" component index {} is out of range; muted",
                action.name, curve.data_path, curve.array_index
            ));
            edits[i].mute = true;
            continue;
        }
        let key = match bone {
            BoneRef::Name(n) => n.clone(),
            BoneRef::Tag(t) => format!("#{t}"),
        };
        let group = match groups.iter_mut().find(|(k, _)| *k == key) {
            Some(g) => g,
            None => {
                groups.push((key, [None; 4]));
                groups.last_mut().unwrap()
            }
        };
        group.1[curve.array_index] = Some(i);
    }

    for (key, slots) in groups {
        if slots.iter().any(|s| s.is_none()) {
            let present: Vec<usize> = slots.iter().flatten().copied().collect();
            sink.warning(format!(
                "{}: \"{}\" rotation animates only some components; muted",
                action.name, key
            ));
            for i in present {
                edits[i].mute = true;
            }
            continue;
        }
        let indices: Vec<usize> = slots.iter().flatten().copied().collect();
        let count = action.curves[indices[0]].keyframes.len();
        if indices
            .iter()
            .any(|&i| action.curves[i].keyframes.len() != count)
        {
            return Err(AnimError::KeyframeCountMismatch {
                bone: key,
                channel: Channel::RotationQuaternion.as_str().to_string(),
            });
        }
        // Local-frame fix, so the correction multiplies on the right.
        stage_quaternions(action, edits, &indices, count, |q| q * correction);
    }
    Ok(())
}

/// Rewrite the (w, x, y, z) component curves at `indices` through `f`.
fn stage_quaternions(
    action: &Action,
    edits: &mut [Edit],
    indices: &[usize],
    count: usize,
    f: impl Fn(Quaternion<f64>) -> Quaternion<f64>,
) {
    let mut staged: Vec<Vec<f64>> = vec![Vec::with_capacity(count); 4];
    for k in 0..count {
        let q = Quaternion::new(
            action.curves[indices[0]].keyframes[k].value,
            action.curves[indices[1]].keyframes[k].value,
            action.curves[indices[2]].keyframes[k].value,
            action.curves[indices[3]].keyframes[k].value,
        );
        let q = f(q);
        staged[0].push(q.w);
        staged[1].push(q.i);
        staged[2].push(q.j);
        staged[3].push(q.k);
    }
    for (c, values) in staged.into_iter().enumerate() {
        edits[indices[c]].values = Some(values);
    }
}
