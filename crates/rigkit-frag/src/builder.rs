//! The fragment build pipeline.
//!
//! Seven deterministic steps: group construction in bone order,
//! pristine/damaged composite merging, child construction, child and
//! composite reordering by group, drawable bound matrices, link
//! classification and attachments, and archetype aggregation. No step
//! iterates a hash map; every ordering is derived from bone order,
//! authored order, or group index.

use crate::error::FragError;
use crate::input::{BoneCollision, FragInput};
use crate::output::{
    Archetype, ChildDrawable, CompositeSlots, Damping, FragFlags, Fragment, GlassWindow,
    PhysicsChild, PhysicsGroup, PhysicsLod, NO_PARENT_GROUP,
};
use nalgebra::Matrix3;
use rigkit_math::{Point3, Transform34, Vec3, Vec4, WarningSink};

/// Build the physics LOD for one fragment.
///
/// Returns an error only for malformed top-level input; per-bone
/// problems produce a warning and a skipped slot, never an abort.
pub fn build_fragment<S: WarningSink>(
    input: &FragInput,
    sink: &mut S,
) -> Result<Fragment, FragError> {
    if input.skeleton.is_empty() {
        return Err(FragError::EmptySkeleton);
    }
    if input.bones.len() != input.skeleton.len() {
        return Err(FragError::BonePropsMismatch {
            expected: input.skeleton.len(),
            got: input.bones.len(),
        });
    }
    for collision in input.collisions.iter().chain(&input.damaged_collisions) {
        if collision.bone_index >= input.skeleton.len() {
            return Err(FragError::CollisionBoneOutOfRange {
                name: collision.name.clone(),
                bone: collision.bone_index,
                len: input.skeleton.len(),
            });
        }
    }

    let bone_count = input.skeleton.len();
    let mut pristine_by_bone: Vec<Vec<usize>> = vec![Vec::new(); bone_count];
    for (i, c) in input.collisions.iter().enumerate() {
        pristine_by_bone[c.bone_index].push(i);
    }
    let mut damaged_by_bone: Vec<Vec<usize>> = vec![Vec::new(); bone_count];
    for (i, c) in input.damaged_collisions.iter().enumerate() {
        damaged_by_bone[c.bone_index].push(i);
    }

    // Step 1: one group per physics bone with a collision or cloth,
    // flattened in bone order so group indices are stable.
    let mut bone_group: Vec<Option<u8>> = vec![None; bone_count];
    let mut groups: Vec<PhysicsGroup> = Vec::new();
    for (i, bone) in input.skeleton.bones.iter().enumerate() {
        let props = &input.bones[i];
        if !props.use_physics {
            continue;
        }
        let has_collision = !pristine_by_bone[i].is_empty() || !damaged_by_bone[i].is_empty();
        if !has_collision && !props.has_cloth {
            sink.warning(format!(
                "{}: bone \"{}\" uses physics but has no collision or cloth mesh; no group created",
                input.name, bone.name
            ));
            continue;
        }
        if groups.len() >= usize::from(NO_PARENT_GROUP) {
            return Err(FragError::TooManyGroups(groups.len() + 1));
        }
        bone_group[i] = Some(groups.len() as u8);
        let g = &props.group;
        groups.push(PhysicsGroup {
            name: bone.name.clone(),
            parent_group_index: NO_PARENT_GROUP,
            bone_index: i,
            flags: g.flags,
            strength: g.strength,
            joint_stiffness: g.joint_stiffness,
            rotation_speed: g.rotation_speed,
            rotation_strength: g.rotation_strength,
            min_damage_force: g.min_damage_force,
            damage_health: g.damage_health,
            weapon_scale: g.weapon_scale,
            melee_scale: g.melee_scale,
            glass_window_index: g.glass_window_index,
            total_mass: 0.0,
        });
    }
    if groups.is_empty() {
        return Err(FragError::NoPhysicsBones);
    }
    // Parent: the nearest ancestor bone that also produced a group,
    // unless the author pinned one explicitly.
    for group in &mut groups {
        group.parent_group_index = match input.bones[group.bone_index].parent_override {
            Some(p) => p,
            None => input
                .skeleton
                .ancestors(group.bone_index)
                .find_map(|a| bone_group[a])
                .unwrap_or(NO_PARENT_GROUP),
        };
    }

    // Steps 2 + 3: pair pristine and damaged collisions per bone
    // (zip-longest with a null fill) into raw children, in bone order.
    struct RawChild {
        bone_index: usize,
        group_index: u8,
        pristine: Option<usize>,
        damaged: Option<usize>,
    }
    let mut raw: Vec<RawChild> = Vec::new();
    for i in 0..bone_count {
        let Some(group_index) = bone_group[i] else {
            let skipped = pristine_by_bone[i]
                .iter()
                .map(|&c| &input.collisions[c])
                .chain(damaged_by_bone[i].iter().map(|&c| &input.damaged_collisions[c]));
            for c in skipped {
                sink.warning(format!(
                    "{}: collision \"{}\" sits on a bone with no physics group; skipped",
                    input.name, c.name
                ));
            }
            continue;
        };
        let pairs = pristine_by_bone[i].len().max(damaged_by_bone[i].len());
        for k in 0..pairs {
            raw.push(RawChild {
                bone_index: i,
                group_index,
                pristine: pristine_by_bone[i].get(k).copied(),
                damaged: damaged_by_bone[i].get(k).copied(),
            });
        }
    }

    // Step 4: stable sort by group index; composite slot assignment
    // follows the sorted order, damaged slots shifted past the
    // pristine region.
    raw.sort_by_key(|c| c.group_index);

    let pristine_len = input.collisions.len();
    let damaged_len = input.damaged_collisions.len();
    let total_slots = pristine_len + damaged_len;
    let mut composite = CompositeSlots {
        pristine: vec![None; total_slots],
        damaged: if damaged_len > 0 {
            vec![None; total_slots]
        } else {
            Vec::new()
        },
    };

    let mut children: Vec<PhysicsChild> = Vec::new();
    let mut child_transforms: Vec<Transform34> = Vec::new();
    let mut child_world_cgs: Vec<Point3> = Vec::new();
    let mut p_next = 0usize;
    let mut d_next = pristine_len;
    for rc in &raw {
        let pristine = rc.pristine.map(|i| &input.collisions[i]);
        let damaged = rc.damaged.map(|i| &input.damaged_collisions[i]);

        if let Some(p) = pristine {
            composite.pristine[p_next] = Some((p.bound.clone(), p.transform));
            p_next += 1;
        }
        if let Some(d) = damaged {
            composite.damaged[d_next] = Some((d.bound.clone(), d.transform));
            d_next += 1;
        }

        let pristine_mass = pristine.map_or(0.0, |p| p.mass);
        let damaged_mass = damaged.map_or(pristine_mass, |d| d.mass);
        let reference = pristine.or(damaged).expect("a pair always has one side");
        let transform = reference.transform;

        children.push(PhysicsChild {
            bone_tag: input.skeleton.bones[rc.bone_index].tag,
            group_index: rc.group_index,
            pristine_mass,
            damaged_mass,
            inertia: pristine.map_or_else(Vec4::zeros, |p| scaled_inertia(p, pristine_mass)),
            damaged_inertia: damaged.map_or_else(Vec4::zeros, |d| scaled_inertia(d, damaged_mass)),
            drawable: None,
            damaged_drawable: None,
        });
        child_transforms.push(transform);
        child_world_cgs.push(transform.apply_point(&reference.bound.cg));

        groups[rc.group_index as usize].total_mass += pristine_mass;
    }

    // Step 5: bound-to-bone matrices on the group's first drawable.
    let bone_world_inv: Vec<Option<rigkit_math::Transform>> = (0..bone_count)
        .map(|i| input.skeleton.world_rest(i).inverse())
        .collect();
    let child_bones: Vec<usize> = raw.iter().map(|c| c.bone_index).collect();
    attach_drawables(
        &input.drawables,
        &child_bones,
        &mut children,
        &child_transforms,
        &bone_world_inv,
    );

    // Step 6: link classification and attachments.
    let mut link_of_group: Vec<usize> = vec![0; groups.len()];
    let mut link_count = 1usize;
    for (g, group) in groups.iter().enumerate() {
        let joint = input.skeleton.bones[group.bone_index].has_joint();
        if joint {
            link_of_group[g] = link_count;
            link_count += 1;
        } else if group.parent_group_index != NO_PARENT_GROUP {
            link_of_group[g] = link_of_group[group.parent_group_index as usize];
        }
    }

    let mut link_mass = vec![0.0f64; link_count];
    let mut link_cg_acc = vec![Vec3::zeros(); link_count];
    for (i, child) in children.iter().enumerate() {
        let link = link_of_group[child.group_index as usize];
        let weight = if child.pristine_mass > 0.0 {
            child.pristine_mass
        } else {
            child.damaged_mass
        };
        link_mass[link] += weight;
        link_cg_acc[link] += child_world_cgs[i].coords * weight;
    }
    let mut link_cgs: Vec<Vec3> = link_mass
        .iter()
        .zip(&link_cg_acc)
        .map(|(&m, acc)| if m > 0.0 { acc / m } else { Vec3::zeros() })
        .collect();
    link_cgs[0] += input.unbroken_cg_offset;
    let root_cg_offset = link_cgs[0];

    let link_attachments: Vec<Transform34> = children
        .iter()
        .enumerate()
        .map(|(i, child)| {
            let link = link_of_group[child.group_index as usize];
            Transform34::from_parts(
                child_transforms[i].linear_part(),
                child_world_cgs[i].coords - link_cgs[link],
            )
        })
        .collect();

    // Step 7: archetype aggregation and the angular-inertia window.
    let archetype = aggregate_archetype(
        &input.name,
        raw.iter()
            .filter_map(|c| c.pristine.map(|i| &input.collisions[i])),
        &root_cg_offset,
    );
    let damaged_archetype = if damaged_len > 0 {
        Some(aggregate_archetype(
            &input.name,
            raw.iter()
                .filter_map(|c| c.damaged.map(|i| &input.damaged_collisions[i])),
            &root_cg_offset,
        ))
    } else {
        None
    };

    let mut largest = 0.0f64;
    for child in &children {
        for k in 0..3 {
            largest = largest.max(child.inertia[k]).max(child.damaged_inertia[k]);
        }
    }
    let smallest = largest / 10000.0;

    let mut flags = FragFlags::empty();
    if link_count > 1 {
        flags |= FragFlags::ARTICULATED;
    }
    if damaged_len > 0 {
        flags |= FragFlags::HAS_DAMAGED;
    }
    let glass_windows: Vec<GlassWindow> = groups
        .iter()
        .enumerate()
        .filter_map(|(g, group)| {
            group.glass_window_index.map(|w| GlassWindow {
                group_index: g as u8,
                window_index: w,
            })
        })
        .collect();
    if !glass_windows.is_empty() {
        flags |= FragFlags::HAS_GLASS;
    }

    let physics = PhysicsLod {
        archetype,
        damaged_archetype,
        groups,
        children,
        composite,
        link_attachments,
        smallest_ang_inertia: smallest,
        largest_ang_inertia: largest,
        root_cg_offset,
        unbroken_cg_offset: input.unbroken_cg_offset,
        damping: Damping::default(),
    };

    // Hi-LOD borrows the pristine child list and ordering; only the
    // drawable references differ.
    let hi_physics = if input.hi_drawables.is_empty() {
        None
    } else {
        let mut hi = physics.clone();
        for child in &mut hi.children {
            child.drawable = None;
            child.damaged_drawable = None;
        }
        attach_drawables(
            &input.hi_drawables,
            &child_bones,
            &mut hi.children,
            &child_transforms,
            &bone_world_inv,
        );
        Some(hi)
    };

    Ok(Fragment {
        name: input.name.clone(),
        flags,
        physics,
        hi_physics,
        glass_windows,
    })
}

/// `bound.inertia · mass`, with `w = bound.volume · mass`.
fn scaled_inertia(collision: &BoneCollision, mass: f64) -> Vec4 {
    let i = collision.bound.inertia * mass;
    Vec4::new(i.x, i.y, i.z, collision.bound.volume * mass)
}

/// Attach child-mesh drawables: only the first child of a group gets
/// one, and when siblings exist it also carries their bound matrices.
fn attach_drawables(
    refs: &[crate::input::ChildMeshRef],
    child_bones: &[usize],
    children: &mut [PhysicsChild],
    child_transforms: &[Transform34],
    bone_world_inv: &[Option<rigkit_math::Transform>],
) {
    let bound_matrix = |i: usize| -> Transform34 {
        match &bone_world_inv[child_bones[i]] {
            Some(inv) => {
                Transform34::from_transform(&child_transforms[i].to_transform().then(inv))
            }
            None => child_transforms[i],
        }
    };

    let mut seen_groups: Vec<u8> = Vec::new();
    for i in 0..children.len() {
        let group = children[i].group_index;
        if seen_groups.contains(&group) {
            continue;
        }
        seen_groups.push(group);
        let bone = child_bones[i];
        let Some(r) = refs.iter().find(|r| r.bone_index == bone) else {
            continue;
        };
        let siblings: Vec<Transform34> = (0..children.len())
            .filter(|&j| j != i && children[j].group_index == group)
            .map(bound_matrix)
            .collect();
        children[i].drawable = Some(ChildDrawable {
            drawable: r.drawable,
            frag_bound_matrix: bound_matrix(i),
            frag_extra_bound_matrices: siblings,
        });
    }
}

/// Volume-weighted parallel-axis aggregation of child bound inertias
/// about the root CoG. Zero total volume yields zero inertia and the
/// inverses guard against it too.
fn aggregate_archetype<'a>(
    name: &str,
    collisions: impl Iterator<Item = &'a BoneCollision>,
    root_cg: &Vec3,
) -> Archetype {
    let mut mass = 0.0;
    let mut volume = 0.0;
    let mut inertia_acc = Vec3::zeros();
    for c in collisions {
        mass += c.mass;
        volume += c.bound.volume;
        let r = c.transform.linear_part();
        let rotated = (r * Matrix3::from_diagonal(&c.bound.inertia) * r.transpose()).diagonal();
        let d = c.transform.apply_point(&c.bound.cg).coords - root_cg;
        let shift = Vec3::new(
            d.y * d.y + d.z * d.z,
            d.z * d.z + d.x * d.x,
            d.x * d.x + d.y * d.y,
        );
        inertia_acc += (rotated + shift) * c.bound.volume;
    }
    let inertia = if volume > 0.0 {
        inertia_acc / volume
    } else {
        Vec3::zeros()
    };
    Archetype {
        name: name.to_string(),
        mass,
        mass_inv: if mass > 0.0 { 1.0 / mass } else { 0.0 },
        inertia,
        inertia_inv: inertia.map(|c| if c > 0.0 { 1.0 / c } else { 0.0 }),
    }
}
