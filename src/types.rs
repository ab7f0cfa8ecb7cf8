#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackType {
    Int,
    String,
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Int(i32),
    Long(i64),
    String(&'static str),
}

// Domain aliases (namedobj, stat, coordgrid) ride the int stack with a -1
// default, like the runtime's entity handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Int,
    String,
    Long,
    Boolean,
    Namedobj,
    Stat,
    Coordgrid,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 7] = [
        PrimitiveType::Int,
        PrimitiveType::String,
        PrimitiveType::Long,
        PrimitiveType::Boolean,
        PrimitiveType::Namedobj,
        PrimitiveType::Stat,
        PrimitiveType::Coordgrid,
    ];

    pub fn representation(&self) -> &'static str {
        match self {
            PrimitiveType::Int => "int",
            PrimitiveType::String => "string",
            PrimitiveType::Long => "long",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Namedobj => "namedobj",
            PrimitiveType::Stat => "stat",
            PrimitiveType::Coordgrid => "coordgrid",
        }
    }

    pub fn stack_type(&self) -> Option<StackType> {
        match self {
            PrimitiveType::String => Some(StackType::String),
            PrimitiveType::Long => Some(StackType::Long),
            _ => Some(StackType::Int),
        }
    }

    pub fn default_value(&self) -> DefaultValue {
        match self {
            PrimitiveType::Int => DefaultValue::Int(0),
            PrimitiveType::String => DefaultValue::String(""),
            PrimitiveType::Long => DefaultValue::Long(0),
            PrimitiveType::Boolean => DefaultValue::Int(0),
            _ => DefaultValue::Int(-1),
        }
    }

    pub fn is_declarable(&self) -> bool {
        self.stack_type().is_some()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, PrimitiveType::Int | PrimitiveType::Long)
    }

    pub fn for_representation(representation: &str) -> Option<PrimitiveType> {
        PrimitiveType::ALL
            .iter()
            .copied()
            .find(|primitive| primitive.representation() == representation)
    }
}

/// The `flattened` sequence is computed once at construction and recurses
/// through nested tuples preserving order; it is the sole basis for tuple
/// equality and stack-slot accounting.
#[derive(Debug, Clone)]
pub struct TupleType {
    children: Vec<Type>,
    flattened: Vec<PrimitiveType>,
}

impl TupleType {
    pub fn new(children: Vec<Type>) -> Self {
        let mut flattened = Vec::new();
        for child in &children {
            match child {
                Type::Primitive(primitive) => flattened.push(*primitive),
                Type::Tuple(tuple) => flattened.extend_from_slice(&tuple.flattened),
            }
        }
        Self {
            children,
            flattened,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn children(&self) -> &[Type] {
        &self.children
    }

    pub fn flattened(&self) -> &[PrimitiveType] {
        &self.flattened
    }

    pub fn representation(&self) -> String {
        self.children
            .iter()
            .map(Type::representation)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Equality is structural over the flattened primitive sequence, so a bare
/// primitive equals a single-element tuple and nesting shape never matters.
#[derive(Debug, Clone)]
pub enum Type {
    Primitive(PrimitiveType),
    Tuple(TupleType),
}

impl Type {
    pub const INT: Type = Type::Primitive(PrimitiveType::Int);
    pub const STRING: Type = Type::Primitive(PrimitiveType::String);
    pub const LONG: Type = Type::Primitive(PrimitiveType::Long);
    pub const BOOLEAN: Type = Type::Primitive(PrimitiveType::Boolean);

    pub fn unit() -> Type {
        Type::Tuple(TupleType::empty())
    }

    pub fn from_list(mut types: Vec<Type>) -> Type {
        if types.len() == 1 {
            types.remove(0)
        } else {
            Type::Tuple(TupleType::new(types))
        }
    }

    pub fn representation(&self) -> String {
        match self {
            Type::Primitive(primitive) => primitive.representation().to_owned(),
            Type::Tuple(tuple) => tuple.representation(),
        }
    }

    pub fn stack_type(&self) -> Option<StackType> {
        match self {
            Type::Primitive(primitive) => primitive.stack_type(),
            Type::Tuple(_) => None,
        }
    }

    pub fn default_value(&self) -> Option<DefaultValue> {
        match self {
            Type::Primitive(primitive) => Some(primitive.default_value()),
            Type::Tuple(_) => None,
        }
    }

    pub fn flattened(&self) -> Vec<PrimitiveType> {
        match self {
            Type::Primitive(primitive) => vec![*primitive],
            Type::Tuple(tuple) => tuple.flattened().to_vec(),
        }
    }

    pub fn slot_count(&self) -> usize {
        match self {
            Type::Primitive(_) => 1,
            Type::Tuple(tuple) => tuple.flattened().len(),
        }
    }

    pub fn is_unit(&self) -> bool {
        self.slot_count() == 0
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            _ => self.flattened() == other.flattened(),
        }
    }
}

impl Eq for Type {}

impl From<PrimitiveType> for Type {
    fn from(primitive: PrimitiveType) -> Self {
        Type::Primitive(primitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(children: Vec<Type>) -> Type {
        Type::Tuple(TupleType::new(children))
    }

    #[test]
    fn flattening_ignores_nesting_shape() {
        // (int, (string, long)) vs ((int, string), long) vs (int, string, long)
        let nested_right = tuple(vec![
            Type::INT,
            tuple(vec![Type::STRING, Type::LONG]),
        ]);
        let nested_left = tuple(vec![
            tuple(vec![Type::INT, Type::STRING]),
            Type::LONG,
        ]);
        let flat = tuple(vec![Type::INT, Type::STRING, Type::LONG]);

        let expected = vec![
            PrimitiveType::Int,
            PrimitiveType::String,
            PrimitiveType::Long,
        ];
        assert_eq!(nested_right.flattened(), expected);
        assert_eq!(nested_left.flattened(), expected);
        assert_eq!(nested_right, nested_left);
        assert_eq!(nested_right, flat);
        assert_eq!(nested_left, flat);
    }

    #[test]
    fn single_element_tuple_equals_its_primitive() {
        let wrapped = tuple(vec![Type::INT]);
        assert_eq!(wrapped, Type::INT);
        assert_eq!(Type::INT, wrapped);
    }

    #[test]
    fn tuples_with_different_sequences_are_not_equal() {
        let a = tuple(vec![Type::INT, Type::STRING]);
        let b = tuple(vec![Type::STRING, Type::INT]);
        assert_ne!(a, b);
    }

    #[test]
    fn representation_joins_direct_children_unflattened() {
        let nested = TupleType::new(vec![
            Type::INT,
            tuple(vec![Type::STRING, Type::LONG]),
        ]);
        assert_eq!(nested.representation(), "int,string,long");
        assert_eq!(nested.children().len(), 2);
    }

    #[test]
    fn tuple_has_no_stack_type_or_default() {
        let pair = tuple(vec![Type::INT, Type::INT]);
        assert_eq!(pair.stack_type(), None);
        assert_eq!(pair.default_value(), None);
        assert_eq!(pair.slot_count(), 2);
    }

    #[test]
    fn unit_type_occupies_no_slots() {
        assert!(Type::unit().is_unit());
        assert_eq!(Type::unit().slot_count(), 0);
    }

    #[test]
    fn representation_round_trip() {
        for primitive in PrimitiveType::ALL {
            assert_eq!(
                PrimitiveType::for_representation(primitive.representation()),
                Some(primitive)
            );
        }
        assert_eq!(PrimitiveType::for_representation("float"), None);
    }
}
