use crate::error::{ClassmergeError, Result};
use crate::resolve::name_key;
use crate::resolve::resolved::{ResolvedClass, ResolvedConfig};
use crate::syntax::{ClassDecl, ConfigFile, Entry, Field, FieldOp, Value};
use indexmap::IndexMap;
use std::rc::Rc;

type NodeId = usize;

const ROOT: NodeId = 0;

/// One class name in one scope, merged across all its declarations.
#[derive(Debug)]
struct Node {
	name: String,
	parent: Option<String>,
	scope: Option<NodeId>,
	/// Sibling position of the first declaration.
	order: usize,
	/// Sibling position of the latest declaration.
	last_order: usize,
	/// Sibling position of the declaration that named the parent.
	parent_order: usize,
	/// Whether any declaration had a body.
	defined: bool,
	fields: IndexMap<String, Field>,
	children: IndexMap<String, NodeId>,
	/// `delete` statements as (sibling position, name as written).
	deletes: Vec<(usize, String)>,
	next_order: usize,
}

impl Node {
	fn new(name: &str, scope: Option<NodeId>, order: usize) -> Self {
		Node {
			name: name.to_string(),
			parent: None,
			scope,
			order,
			last_order: order,
			parent_order: order,
			defined: false,
			fields: IndexMap::new(),
			children: IndexMap::new(),
			deletes: Vec::new(),
			next_order: 0,
		}
	}
}

/// The class table: every declared class keyed by scope and name.
#[derive(Debug)]
pub struct ClassTree {
	nodes: Vec<Node>,
}

impl ClassTree {
	/// Collect the declarations of `file`, reopening classes declared twice.
	pub fn build(file: &ConfigFile) -> Result<Self> {
		let mut root = Node::new("", None, 0);
		root.defined = true;
		let mut tree = ClassTree { nodes: vec![root] };
		tree.add_entries(ROOT, &file.entries)?;
		Ok(tree)
	}

	/// Number of distinct classes declared (forward declarations included).
	pub fn len(&self) -> usize {
		self.nodes.len() - 1
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Slash-separated path of a node, for messages.
	fn path(&self, id: NodeId) -> String {
		let mut segments = Vec::new();
		let mut current = Some(id);
		while let Some(node_id) = current.filter(|&n| n != ROOT) {
			segments.push(self.nodes[node_id].name.as_str());
			current = self.nodes[node_id].scope;
		}
		segments.reverse();
		segments.join("/")
	}

	fn add_entries(&mut self, scope: NodeId, entries: &[Entry]) -> Result<()> {
		for entry in entries {
			match entry {
				Entry::Field(field) => self.add_field(scope, field),
				Entry::Class(decl) => self.add_class(scope, decl)?,
				Entry::Delete(name) => {
					let node = &mut self.nodes[scope];
					node.deletes.push((node.next_order, name.clone()));
					node.next_order += 1;
				}
			}
		}
		Ok(())
	}

	fn add_field(&mut self, scope: NodeId, field: &Field) {
		let fields = &mut self.nodes[scope].fields;
		let key = name_key(&field.key);

		if field.op == FieldOp::Append
			&& let Some(existing) = fields.get_mut(&key)
			&& let (Value::Array(items), Value::Array(extra)) = (&mut existing.value, &field.value)
		{
			items.extend(extra.iter().cloned());
			return;
		}

		fields.insert(key, field.clone());
	}

	fn add_class(&mut self, scope: NodeId, decl: &ClassDecl) -> Result<()> {
		let order = self.nodes[scope].next_order;
		self.nodes[scope].next_order += 1;

		let key = name_key(&decl.name);
		let id = match self.nodes[scope].children.get(&key) {
			Some(&existing) => {
				tracing::debug!(class = %self.path(existing), "reopening class");
				self.nodes[existing].last_order = order;
				existing
			}
			None => {
				let id = self.nodes.len();
				self.nodes.push(Node::new(&decl.name, Some(scope), order));
				self.nodes[scope].children.insert(key, id);
				id
			}
		};

		if let Some(requested) = &decl.parent {
			match &self.nodes[id].parent {
				Some(existing) if !existing.eq_ignore_ascii_case(requested) => {
					return Err(ClassmergeError::ConflictingParent {
						class: self.path(id),
						existing: existing.clone(),
						requested: requested.clone(),
					});
				}
				Some(_) => {}
				None => {
					let node = &mut self.nodes[id];
					node.parent = Some(requested.clone());
					node.parent_order = order;
				}
			}
		}

		if let Some(body) = &decl.body {
			self.nodes[id].defined = true;
			self.add_entries(id, body)?;
		}

		Ok(())
	}

	/// Resolve every class into a [`ResolvedConfig`].
	pub fn resolve(&self) -> Result<ResolvedConfig> {
		let mut resolver = Resolver {
			tree: self,
			resolved: vec![None; self.nodes.len()],
			bases: vec![None; self.nodes.len()],
			visiting: Vec::new(),
		};
		let root = resolver.resolve_node(ROOT)?;

		let externals = resolver
			.resolved
			.iter()
			.flatten()
			.filter(|class| class.is_external())
			.count();
		tracing::info!(
			classes = self.len(),
			top_level = root.class_count(),
			externals,
			"resolved class tree"
		);

		Ok(ResolvedConfig { root })
	}
}

enum Step<'a> {
	Insert(&'a String, NodeId),
	Delete(&'a String),
}

struct Resolver<'t> {
	tree: &'t ClassTree,
	resolved: Vec<Option<Rc<ResolvedClass>>>,
	/// Memoized resolved parent per node (`Some(None)` = no parent).
	bases: Vec<Option<Option<Rc<ResolvedClass>>>>,
	visiting: Vec<NodeId>,
}

impl Resolver<'_> {
	fn resolve_node(&mut self, id: NodeId) -> Result<Rc<ResolvedClass>> {
		if let Some(done) = &self.resolved[id] {
			return Ok(Rc::clone(done));
		}
		if self.visiting.contains(&id) {
			return Err(ClassmergeError::CyclicInheritance {
				class: self.tree.path(id),
			});
		}

		self.visiting.push(id);
		let result = self.build_node(id);
		self.visiting.pop();

		let class = result?;
		self.resolved[id] = Some(Rc::clone(&class));
		Ok(class)
	}

	fn build_node(&mut self, id: NodeId) -> Result<Rc<ResolvedClass>> {
		let tree = self.tree;
		let node = &tree.nodes[id];
		let key = name_key(&node.name);

		if !node.defined {
			// A forward declaration names the class inherited into this scope,
			// or an external class known only by name.
			let inherited = match node.scope {
				Some(scope) => self
					.base_of(scope)?
					.and_then(|base| base.classes.get(&key).cloned()),
				None => None,
			};
			return Ok(inherited.unwrap_or_else(|| Rc::new(ResolvedClass::external(&node.name))));
		}

		let base = self.base_of(id)?;
		let mut class = ResolvedClass {
			name: node.name.clone(),
			parent: node.parent.clone(),
			..Default::default()
		};
		if let Some(base) = &base {
			class.fields = base.fields.clone();
			class.classes = base.classes.clone();
		}
		class.base = base;

		for (key, field) in &node.fields {
			let value = match (field.op, class.fields.get(key), &field.value) {
				(FieldOp::Append, Some((_, Value::Array(inherited))), Value::Array(extra)) => {
					let mut items = inherited.clone();
					items.extend(extra.iter().cloned());
					Value::Array(items)
				}
				_ => field.value.clone(),
			};
			class.fields.insert(key.clone(), (field.key.clone(), value));
		}

		// Nested declarations and deletes apply in source order. A class
		// declared again after a delete of its name comes back.
		let mut steps: Vec<(usize, Step)> = node
			.deletes
			.iter()
			.map(|(order, name)| (*order, Step::Delete(name)))
			.collect();
		for (key, &child) in &node.children {
			let declared = &tree.nodes[child];
			steps.push((declared.order, Step::Insert(key, child)));
			if declared.last_order != declared.order {
				steps.push((declared.last_order, Step::Insert(key, child)));
			}
		}
		steps.sort_by_key(|(order, _)| *order);

		for (_, step) in steps {
			match step {
				Step::Insert(key, child) => {
					let resolved = self.resolve_node(child)?;
					class.classes.insert(key.clone(), resolved);
				}
				Step::Delete(name) => {
					if class.classes.shift_remove(&name_key(name)).is_none() {
						return Err(ClassmergeError::DeleteUndefined {
							scope: tree.path(id),
							name: name.clone(),
						});
					}
				}
			}
		}

		Ok(Rc::new(class))
	}

	/// The resolved parent of `id`, if it names one.
	fn base_of(&mut self, id: NodeId) -> Result<Option<Rc<ResolvedClass>>> {
		if let Some(done) = &self.bases[id] {
			return Ok(done.clone());
		}

		let base = match &self.tree.nodes[id].parent {
			Some(parent) => Some(self.lookup_parent(id, parent)?),
			None => None,
		};
		self.bases[id] = Some(base.clone());
		Ok(base)
	}

	/// Find the class `parent` refers to from the declaration of `id`.
	///
	/// Each scope from the innermost outwards is searched for a sibling
	/// declared earlier, then for a class inherited into that scope.
	fn lookup_parent(&mut self, id: NodeId, parent: &str) -> Result<Rc<ResolvedClass>> {
		let tree = self.tree;
		let key = name_key(parent);
		let mut current = id;

		while let Some(scope) = tree.nodes[current].scope {
			let before = if current == id {
				tree.nodes[id].parent_order
			} else {
				tree.nodes[current].order
			};

			if let Some(&candidate) = tree.nodes[scope].children.get(&key)
				&& candidate != current
				&& tree.nodes[candidate].order < before
			{
				return self.resolve_node(candidate);
			}

			if let Some(inherited) = self
				.base_of(scope)?
				.and_then(|base| base.classes.get(&key).cloned())
			{
				return Ok(inherited);
			}

			current = scope;
		}

		Err(ClassmergeError::UndefinedParent {
			class: tree.path(id),
			parent: parent.to_string(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::syntax::parse_str;
	use std::path::Path;

	fn resolve(source: &str) -> Result<ResolvedConfig> {
		let parsed = parse_str(source, Path::new("test.hpp"), false)?;
		ClassTree::build(&parsed.file)?.resolve()
	}

	fn keys(class: &ResolvedClass) -> Vec<&str> {
		class.fields().map(|(key, _)| key).collect()
	}

	const VEHICLES: &str = r#"
class CfgVehicles
{
	class LandVehicle;
	class Car: LandVehicle
	{
		class ACE_Actions
		{
			class ACE_MainActions {};
		};
	};
	class Car_F: Car {};
	class CUP_MTVR_Base: Car_F {};
	class CUP_MTVR_Refuel_Base: CUP_MTVR_Base
	{
		transportFuel = 0;
		ace_refuel_hooks[] = {{-1.09,-0.01,-0.5},{1,-0.01,-0.5}};
		ace_refuel_fuelCargo = 10000;
	};
};
"#;

	#[test]
	fn test_refuel_example_keeps_ancestor_content() {
		let config = resolve(VEHICLES).unwrap();
		let refuel = config.class("CfgVehicles/CUP_MTVR_Refuel_Base").unwrap();

		assert_eq!(
			keys(refuel),
			vec!["transportFuel", "ace_refuel_hooks", "ace_refuel_fuelCargo"]
		);
		assert_eq!(refuel.field("ace_refuel_fuelCargo"), Some(&Value::Int(10000)));
		assert!(
			refuel
				.class("ACE_Actions")
				.and_then(|actions| actions.class("ACE_MainActions"))
				.is_some()
		);
		assert_eq!(
			refuel.ancestors(),
			vec!["CUP_MTVR_Base", "Car_F", "Car", "LandVehicle"]
		);
	}

	#[test]
	fn test_forward_declaration_is_empty_anchor() {
		let config = resolve(VEHICLES).unwrap();
		let land = config.class("CfgVehicles/LandVehicle").unwrap();
		assert!(land.is_external());
		assert_eq!(land.field_count(), 0);
		assert_eq!(land.class_count(), 0);
		assert!(!config.class("CfgVehicles/Car").unwrap().is_external());
	}

	#[test]
	fn test_child_overlays_parent() {
		let config = resolve(
			r#"
class Base { a = 1; b = "x"; list[] = {1, 2}; };
class Child: Base { b = "y"; c = 3.5; };
"#,
		)
		.unwrap();
		let child = config.class("Child").unwrap();

		assert_eq!(keys(child), vec!["a", "b", "list", "c"]);
		assert_eq!(child.field("a"), Some(&Value::Int(1)));
		assert_eq!(child.field("b"), Some(&Value::Str("y".to_string())));
		assert_eq!(child.field("c"), Some(&Value::Float(3.5)));
		assert_eq!(
			config.class("Base").unwrap().field("b"),
			Some(&Value::Str("x".to_string()))
		);
	}

	#[test]
	fn test_redeclaration_reopens_class() {
		let config = resolve(
			r#"
class Base { a = 1; };
class Base { a = 2; b = 3; };
class Child: Base {};
"#,
		)
		.unwrap();

		let base = config.class("Base").unwrap();
		assert_eq!(base.field("a"), Some(&Value::Int(2)));
		assert_eq!(base.field("b"), Some(&Value::Int(3)));
		assert_eq!(config.class("Child").unwrap().field_count(), 2);
		assert_eq!(config.len(), 2);
	}

	#[test]
	fn test_forward_then_definition_merges() {
		let config = resolve(
			r#"
class Air;
class Helicopter;
class Helicopter: Air { x = 1; };
class Helicopter;
"#,
		)
		.unwrap();
		let heli = config.class("Helicopter").unwrap();
		assert!(!heli.is_external());
		assert_eq!(heli.parent_name(), Some("Air"));
		assert_eq!(heli.field("x"), Some(&Value::Int(1)));
	}

	#[test]
	fn test_undefined_parent_is_error() {
		match resolve("class A: Missing {};").unwrap_err() {
			ClassmergeError::UndefinedParent { class, parent } => {
				assert_eq!(class, "A");
				assert_eq!(parent, "Missing");
			}
			other => panic!("Expected UndefinedParent error, got {other:?}"),
		}
	}

	#[test]
	fn test_parent_must_be_declared_first() {
		let result = resolve("class Child: Base {};\nclass Base {};");
		assert!(matches!(
			result,
			Err(ClassmergeError::UndefinedParent { .. })
		));
	}

	#[test]
	fn test_conflicting_parent_on_reopen() {
		match resolve("class A; class B; class C: A {}; class C: B {};").unwrap_err() {
			ClassmergeError::ConflictingParent {
				class,
				existing,
				requested,
			} => {
				assert_eq!(class, "C");
				assert_eq!(existing, "A");
				assert_eq!(requested, "B");
			}
			other => panic!("Expected ConflictingParent error, got {other:?}"),
		}
		// Same parent with different case is not a conflict.
		assert!(resolve("class A; class C: A {}; class C: a {};").is_ok());
	}

	#[test]
	fn test_cycle_through_reopen() {
		let result = resolve("class A; class B: A {}; class A: B {};");
		assert!(matches!(
			result,
			Err(ClassmergeError::CyclicInheritance { .. })
		));
	}

	#[test]
	fn test_nested_classes_override_by_name() {
		let config = resolve(
			r#"
class Heli_Base
{
	class UserActions
	{
		class OpenDoors { condition = "open"; };
		class CloseDoors: OpenDoors { condition = "base"; };
	};
	class Turrets {};
};
class UH60: Heli_Base
{
	class UserActions
	{
		class OpenDoors;
		class CloseDoors: OpenDoors { condition = "doors"; };
	};
};
"#,
		)
		.unwrap();

		let uh60 = config.class("UH60").unwrap();
		assert!(uh60.class("Turrets").is_some());

		// UserActions is redeclared without a parent, so it replaces the
		// inherited one and OpenDoors becomes an external anchor.
		let actions = uh60.class("UserActions").unwrap();
		assert!(actions.class("OpenDoors").unwrap().is_external());
		let close = actions.class("CloseDoors").unwrap();
		assert_eq!(close.field("condition"), Some(&Value::Str("doors".into())));
		assert_eq!(close.field_count(), 1);
	}

	#[test]
	fn test_forward_declaration_refers_to_inherited_class() {
		let config = resolve(
			r#"
class Heli_Base
{
	class UserActions
	{
		class OpenDoors { condition = "open"; priority = 1; };
	};
};
class UH60: Heli_Base
{
	class UserActions: UserActions
	{
		class OpenDoors;
		class CloseDoors: OpenDoors { condition = "close"; };
	};
};
"#,
		)
		.unwrap();

		let actions = config.class("UH60/UserActions").unwrap();
		let open = actions.class("OpenDoors").unwrap();
		assert!(!open.is_external());
		assert_eq!(open.field("priority"), Some(&Value::Int(1)));

		let close = actions.class("CloseDoors").unwrap();
		assert_eq!(close.field("priority"), Some(&Value::Int(1)));
		assert_eq!(close.field("condition"), Some(&Value::Str("close".into())));
		assert_eq!(close.ancestors(), vec!["OpenDoors"]);
	}

	#[test]
	fn test_parent_found_in_enclosing_scope() {
		let config = resolve(
			r#"
class Shared { x = 1; };
class Outer
{
	class Inner: Shared { y = 2; };
};
"#,
		)
		.unwrap();
		let inner = config.class("Outer/Inner").unwrap();
		assert_eq!(inner.field("x"), Some(&Value::Int(1)));
		assert_eq!(inner.field("y"), Some(&Value::Int(2)));
	}

	#[test]
	fn test_delete_removes_inherited_class() {
		let config = resolve(
			r#"
class Base { class Turrets {}; class Hit {}; };
class Child: Base { delete Turrets; };
"#,
		)
		.unwrap();
		let child = config.class("Child").unwrap();
		assert!(child.class("Turrets").is_none());
		assert!(child.class("Hit").is_some());

		match resolve("class A { delete Nothing; };").unwrap_err() {
			ClassmergeError::DeleteUndefined { scope, name } => {
				assert_eq!(scope, "A");
				assert_eq!(name, "Nothing");
			}
			other => panic!("Expected DeleteUndefined error, got {other:?}"),
		}
	}

	#[test]
	fn test_delete_follows_source_order() {
		let config = resolve(
			r#"
class Base { class Turrets {}; };
class Child: Base { class Turrets { x = 1; }; delete Turrets; };
class Own { class N {}; delete N; };
class Again { class N {}; delete N; class N { y = 2; }; };
"#,
		)
		.unwrap();
		assert!(config.class("Child/Turrets").is_err());
		assert_eq!(config.class("Own").unwrap().class_count(), 0);
		assert_eq!(
			config.class("Again/N").unwrap().field("y"),
			Some(&Value::Int(2))
		);

		match resolve("class A { delete N; class N {}; };").unwrap_err() {
			ClassmergeError::DeleteUndefined { scope, name } => {
				assert_eq!(scope, "A");
				assert_eq!(name, "N");
			}
			other => panic!("Expected DeleteUndefined error, got {other:?}"),
		}
	}

	#[test]
	fn test_array_append() {
		let config = resolve(
			r#"
class Base { items[] = {1, 2}; };
class Child: Base { items[] += {3}; fresh[] += {"a"}; };
class Twice { list[] = {1}; list[] += {2}; };
"#,
		)
		.unwrap();
		let child = config.class("Child").unwrap();
		assert_eq!(
			child.field("items"),
			Some(&Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
		);
		assert_eq!(
			child.field("fresh"),
			Some(&Value::Array(vec![Value::Str("a".into())]))
		);
		assert_eq!(
			config.class("Twice").unwrap().field("list"),
			Some(&Value::Array(vec![Value::Int(1), Value::Int(2)]))
		);
	}

	#[test]
	fn test_names_are_case_insensitive() {
		let config = resolve(
			r#"
class Truck_02_base_F;
class CUP_Kamaz_5350_Base: truck_02_BASE_f {};
class CUP_Kamaz_5350_ReAmmo_Base: CUP_Kamaz_5350_Base { transportAmmo = 0; TransportAmmo = 5; };
"#,
		)
		.unwrap();
		let reammo = config.class("cup_kamaz_5350_reammo_base").unwrap();
		assert_eq!(reammo.field_count(), 1);
		assert_eq!(reammo.field("transportammo"), Some(&Value::Int(5)));
		assert_eq!(reammo.ancestors(), vec!["CUP_Kamaz_5350_Base", "Truck_02_base_F"]);
	}

	#[test]
	fn test_tree_len_counts_distinct_classes() {
		let parsed = parse_str(VEHICLES, Path::new("t.hpp"), false).unwrap();
		let tree = ClassTree::build(&parsed.file).unwrap();
		assert_eq!(tree.len(), 8);
		assert!(!tree.is_empty());
	}
}
