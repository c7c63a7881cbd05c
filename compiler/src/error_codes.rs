//! Global Error Code Registry for the IDL flattening stage
//!
//! Every diagnostic the flattening stage reports carries a code from this
//! module. Codes are grouped by range, following the error taxonomy of the
//! compiler:
//!
//! # Error Code Ranges
//!
//! - E1000-E1999: Name errors (collisions, unresolvable references, imports)
//! - E2000-E2999: Type errors (unknown types, template arity, nullability)
//! - E3000-E3999: Constant errors (literals, identifier constants, conversions)
//! - E4000-E4999: Structural errors (member uniqueness, ordinals, cycles)
//! - E5000-E5999: Protocol errors (composition, method collisions)
//! - E6000-E6999: Attribute errors (placement, values, constraints)
//! - E9000-E9999: Library-level errors

use std::collections::HashMap;
use std::fmt;

/// Numeric codes, for use at report sites
pub mod codes {
    // Names
    pub const NAME_COLLISION: u16 = 1001;
    pub const UNKNOWN_DEPENDENT_LIBRARY: u16 = 1002;
    pub const UNKNOWN_LIBRARY: u16 = 1003;
    pub const DUPLICATE_IMPORT: u16 = 1004;
    pub const DECL_CONFLICTS_WITH_IMPORT: u16 = 1005;

    // Types
    pub const UNKNOWN_TYPE: u16 = 2001;
    pub const CANNOT_BE_PARAMETRIZED: u16 = 2002;
    pub const MUST_BE_PARAMETRIZED: u16 = 2003;
    pub const CANNOT_HAVE_SIZE: u16 = 2004;
    pub const MUST_HAVE_SIZE: u16 = 2005;
    pub const CANNOT_BE_NULLABLE: u16 = 2006;
    pub const MUST_BE_PROTOCOL: u16 = 2007;
    pub const ALIAS_PARAMETRIZED_TWICE: u16 = 2008;
    pub const RECURSIVE_ALIAS: u16 = 2009;
    pub const INVALID_SUBTYPE: u16 = 2010;
    pub const NULLABLE_MEMBER: u16 = 2011;
    pub const SERVICE_MEMBER_NOT_PROTOCOL: u16 = 2012;

    // Constants
    pub const CANNOT_INTERPRET_CONSTANT: u16 = 3001;
    pub const STRING_TOO_LONG: u16 = 3002;
    pub const UNKNOWN_CONSTANT: u16 = 3003;
    pub const CONSTANT_CYCLE: u16 = 3004;
    pub const EXPECTED_VALUE: u16 = 3005;
    pub const UNKNOWN_MEMBER: u16 = 3006;
    pub const MISMATCHED_NAMED_TYPE: u16 = 3007;
    pub const CANNOT_CONVERT_CONSTANT: u16 = 3008;
    pub const INVALID_CONSTANT_TYPE: u16 = 3009;
    pub const TABLE_DEFAULT: u16 = 3010;

    // Structure
    pub const DUPLICATE_MEMBER_NAME: u16 = 4001;
    pub const DUPLICATE_MEMBER_VALUE: u16 = 4002;
    pub const BITS_MEMBER_NOT_POWER_OF_TWO: u16 = 4003;
    pub const DUPLICATE_ORDINAL: u16 = 4004;
    pub const NON_DENSE_ORDINALS: u16 = 4005;
    pub const DECLARATION_CYCLE: u16 = 4006;
    pub const ZERO_ORDINAL: u16 = 4007;
    pub const MIXED_ORDINAL_STYLES: u16 = 4008;
    pub const RESERVED_WITHOUT_ORDINAL: u16 = 4009;
    pub const EMPTY_UNION: u16 = 4010;

    // Protocols
    pub const NOT_FRAGILE_BASE: u16 = 5001;
    pub const COMPOSED_NOT_PROTOCOL: u16 = 5002;
    pub const DUPLICATE_METHOD_NAME: u16 = 5003;
    pub const DUPLICATE_METHOD_ORDINAL: u16 = 5004;
    pub const DUPLICATE_COMPOSITION: u16 = 5005;

    // Attributes
    pub const INVALID_ATTRIBUTE_PLACEMENT: u16 = 6001;
    pub const INVALID_ATTRIBUTE_VALUE: u16 = 6002;
    pub const ATTRIBUTE_CONSTRAINT_FAILED: u16 = 6003;
    pub const DUPLICATE_ATTRIBUTE: u16 = 6004;
    pub const SUSPECT_ATTRIBUTE: u16 = 6005;
    pub const UNPARSABLE_BOUND: u16 = 6006;
    pub const TOO_MANY_BYTES: u16 = 6007;
    pub const TOO_MANY_HANDLES: u16 = 6008;
    pub const INVALID_RESULT_UNION: u16 = 6009;
    pub const INVALID_TRANSPORT: u16 = 6010;
    pub const MEMBER_NOT_SIMPLE: u16 = 6011;

    // Libraries
    pub const LIBRARY_NAME_MISMATCH: u16 = 9001;
    pub const INVALID_LIBRARY_NAME: u16 = 9002;
    pub const UNUSED_IMPORT: u16 = 9003;
    pub const DEPENDENCY_FAILED: u16 = 9004;
    pub const DUPLICATE_LIBRARY: u16 = 9005;
}

/// Error code struct containing the numeric code and human-readable description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// The numeric error code (e.g., 1001)
    pub code: u16,
    /// Human-readable error category
    pub category: &'static str,
    /// Brief description of what this error means
    pub description: &'static str,
    /// Optional help text with suggestions for fixing the error
    pub help: Option<&'static str>,
}

impl ErrorCode {
    pub const fn new(
        code: u16,
        category: &'static str,
        description: &'static str,
        help: Option<&'static str>,
    ) -> Self {
        Self {
            code,
            category,
            description,
            help,
        }
    }

    /// Format the error code as "E{code:04}" (e.g., "E1001")
    pub fn format_code(&self) -> String {
        format_error_code(self.code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {}",
            self.format_code(),
            self.category,
            self.description
        )
    }
}

/// Registry containing all defined error codes
pub struct ErrorCodeRegistry {
    codes: HashMap<u16, ErrorCode>,
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorCodeRegistry {
    /// Create a new registry with all predefined error codes
    pub fn new() -> Self {
        let mut registry = Self {
            codes: HashMap::new(),
        };
        registry.register_all_codes();
        registry
    }

    pub fn get(&self, code: u16) -> Option<&ErrorCode> {
        self.codes.get(&code)
    }

    /// Get an error code by its formatted string (e.g., "E1001")
    pub fn get_by_string(&self, code_str: &str) -> Option<&ErrorCode> {
        parse_error_code(code_str).and_then(|code| self.get(code))
    }

    fn register(&mut self, error_code: ErrorCode) {
        let previous = self.codes.insert(error_code.code, error_code);
        debug_assert!(previous.is_none(), "error code registered twice");
    }

    fn register_all_codes(&mut self) {
        use codes::*;

        // ===== NAME ERRORS (E1000-E1999) =====
        self.register(ErrorCode::new(
            NAME_COLLISION,
            "Name",
            "Name collision",
            Some("Rename one of the declarations; names must be unique within a library"),
        ));
        self.register(ErrorCode::new(
            UNKNOWN_DEPENDENT_LIBRARY,
            "Name",
            "Unknown dependent library",
            Some("Add a `using` directive for the library the reference names"),
        ));
        self.register(ErrorCode::new(
            UNKNOWN_LIBRARY,
            "Name",
            "Library not found",
            Some("Compile the imported library before the library that imports it"),
        ));
        self.register(ErrorCode::new(
            DUPLICATE_IMPORT,
            "Name",
            "Library imported twice",
            Some("Remove the repeated `using` directive"),
        ));
        self.register(ErrorCode::new(
            DECL_CONFLICTS_WITH_IMPORT,
            "Name",
            "Declaration conflicts with an import",
            Some("Rename the declaration or import the library under an alias"),
        ));

        // ===== TYPE ERRORS (E2000-E2999) =====
        self.register(ErrorCode::new(
            UNKNOWN_TYPE,
            "Type",
            "Unknown type",
            Some("Check the spelling, or import the library that declares the type"),
        ));
        self.register(ErrorCode::new(
            CANNOT_BE_PARAMETRIZED,
            "Type",
            "Type cannot be parametrized",
            None,
        ));
        self.register(ErrorCode::new(
            MUST_BE_PARAMETRIZED,
            "Type",
            "Type must be parametrized",
            Some("Supply an element type, e.g. vector<uint8>"),
        ));
        self.register(ErrorCode::new(
            CANNOT_HAVE_SIZE,
            "Type",
            "Type cannot have a size bound",
            None,
        ));
        self.register(ErrorCode::new(
            MUST_HAVE_SIZE,
            "Type",
            "Type must have a non-zero size",
            Some("Arrays need a size, e.g. array<uint8>:16"),
        ));
        self.register(ErrorCode::new(
            CANNOT_BE_NULLABLE,
            "Type",
            "Type cannot be nullable",
            None,
        ));
        self.register(ErrorCode::new(
            MUST_BE_PROTOCOL,
            "Type",
            "Type must be a protocol",
            None,
        ));
        self.register(ErrorCode::new(
            ALIAS_PARAMETRIZED_TWICE,
            "Type",
            "Alias parameter supplied twice",
            Some("Supply each parameter either in the alias or at the use site, not both"),
        ));
        self.register(ErrorCode::new(
            RECURSIVE_ALIAS,
            "Type",
            "Type alias includes a cycle",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_SUBTYPE,
            "Type",
            "Invalid underlying type",
            Some("Bits need an unsigned integer type; enums need an integer type"),
        ));
        self.register(ErrorCode::new(
            NULLABLE_MEMBER,
            "Type",
            "Member cannot be nullable",
            Some("Table and union members are already optional through their envelope"),
        ));
        self.register(ErrorCode::new(
            SERVICE_MEMBER_NOT_PROTOCOL,
            "Type",
            "Invalid service member",
            Some("Service members must be non-nullable protocol references"),
        ));

        // ===== CONSTANT ERRORS (E3000-E3999) =====
        self.register(ErrorCode::new(
            CANNOT_INTERPRET_CONSTANT,
            "Constant",
            "Constant cannot be interpreted as the expected type",
            None,
        ));
        self.register(ErrorCode::new(
            STRING_TOO_LONG,
            "Constant",
            "String constant exceeds its bound",
            None,
        ));
        self.register(ErrorCode::new(
            UNKNOWN_CONSTANT,
            "Constant",
            "Unknown constant",
            None,
        ));
        self.register(ErrorCode::new(
            CONSTANT_CYCLE,
            "Constant",
            "Constant depends on itself",
            None,
        ));
        self.register(ErrorCode::new(
            EXPECTED_VALUE,
            "Constant",
            "Expected a value but found a type",
            None,
        ));
        self.register(ErrorCode::new(
            UNKNOWN_MEMBER,
            "Constant",
            "Unknown member",
            None,
        ));
        self.register(ErrorCode::new(
            MISMATCHED_NAMED_TYPE,
            "Constant",
            "Mismatched named type assignment",
            Some("Values of one enum or bits type cannot be used for another"),
        ));
        self.register(ErrorCode::new(
            CANNOT_CONVERT_CONSTANT,
            "Constant",
            "Constant cannot be converted",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_CONSTANT_TYPE,
            "Constant",
            "Invalid constant type",
            Some("Constants must be primitives, non-nullable strings, enums or bits"),
        ));
        self.register(ErrorCode::new(
            TABLE_DEFAULT,
            "Constant",
            "Defaults on table members are not supported",
            None,
        ));

        // ===== STRUCTURAL ERRORS (E4000-E4999) =====
        self.register(ErrorCode::new(
            DUPLICATE_MEMBER_NAME,
            "Structure",
            "Duplicate member name",
            None,
        ));
        self.register(ErrorCode::new(
            DUPLICATE_MEMBER_VALUE,
            "Structure",
            "Duplicate member value",
            None,
        ));
        self.register(ErrorCode::new(
            BITS_MEMBER_NOT_POWER_OF_TWO,
            "Structure",
            "Bits member is not a power of two",
            None,
        ));
        self.register(ErrorCode::new(
            DUPLICATE_ORDINAL,
            "Structure",
            "Duplicate ordinal",
            None,
        ));
        self.register(ErrorCode::new(
            NON_DENSE_ORDINALS,
            "Structure",
            "Ordinals are not dense",
            Some("Mark the missing ordinal as reserved"),
        ));
        self.register(ErrorCode::new(
            DECLARATION_CYCLE,
            "Structure",
            "Declarations include a cycle",
            Some("Make one of the members in the cycle nullable to store it out of line"),
        ));
        self.register(ErrorCode::new(
            ZERO_ORDINAL,
            "Structure",
            "Ordinal value 0 disallowed",
            Some("Use a different Selector to change the hashed ordinal"),
        ));
        self.register(ErrorCode::new(
            MIXED_ORDINAL_STYLES,
            "Structure",
            "Explicit and hashed ordinals mixed",
            Some("Give every member an explicit ordinal, or none of them"),
        ));
        self.register(ErrorCode::new(
            RESERVED_WITHOUT_ORDINAL,
            "Structure",
            "Reserved member without an ordinal",
            None,
        ));
        self.register(ErrorCode::new(
            EMPTY_UNION,
            "Structure",
            "Union has no members",
            None,
        ));

        // ===== PROTOCOL ERRORS (E5000-E5999) =====
        self.register(ErrorCode::new(
            NOT_FRAGILE_BASE,
            "Protocol",
            "Composed protocol is not marked [FragileBase]",
            Some("Add [FragileBase] to the protocol being composed"),
        ));
        self.register(ErrorCode::new(
            COMPOSED_NOT_PROTOCOL,
            "Protocol",
            "Composed declaration is not a protocol",
            None,
        ));
        self.register(ErrorCode::new(
            DUPLICATE_METHOD_NAME,
            "Protocol",
            "Duplicate method name",
            None,
        ));
        self.register(ErrorCode::new(
            DUPLICATE_METHOD_ORDINAL,
            "Protocol",
            "Duplicate method ordinal",
            Some("Use [Selector = \"name\"] to change the name used to compute the ordinal"),
        ));
        self.register(ErrorCode::new(
            DUPLICATE_COMPOSITION,
            "Protocol",
            "Protocol composed multiple times",
            None,
        ));

        // ===== ATTRIBUTE ERRORS (E6000-E6999) =====
        self.register(ErrorCode::new(
            INVALID_ATTRIBUTE_PLACEMENT,
            "Attribute",
            "Attribute placement disallowed",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_ATTRIBUTE_VALUE,
            "Attribute",
            "Invalid attribute value",
            None,
        ));
        self.register(ErrorCode::new(
            ATTRIBUTE_CONSTRAINT_FAILED,
            "Attribute",
            "Attribute constraint not satisfied",
            None,
        ));
        self.register(ErrorCode::new(
            DUPLICATE_ATTRIBUTE,
            "Attribute",
            "Duplicate attribute",
            None,
        ));
        self.register(ErrorCode::new(
            SUSPECT_ATTRIBUTE,
            "Attribute",
            "Possibly misspelled attribute",
            None,
        ));
        self.register(ErrorCode::new(
            UNPARSABLE_BOUND,
            "Attribute",
            "Attribute bound is not a valid u32",
            None,
        ));
        self.register(ErrorCode::new(
            TOO_MANY_BYTES,
            "Attribute",
            "Declaration exceeds its MaxBytes bound",
            None,
        ));
        self.register(ErrorCode::new(
            TOO_MANY_HANDLES,
            "Attribute",
            "Declaration exceeds its MaxHandles bound",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_RESULT_UNION,
            "Attribute",
            "Invalid result union",
            Some("The error member must be int32, uint32 or an enum of either"),
        ));
        self.register(ErrorCode::new(
            INVALID_TRANSPORT,
            "Attribute",
            "Invalid transport",
            None,
        ));
        self.register(ErrorCode::new(
            MEMBER_NOT_SIMPLE,
            "Attribute",
            "Member is not simple",
            Some("Simple layouts allow only bounded vectors and strings"),
        ));

        // ===== LIBRARY ERRORS (E9000-E9999) =====
        self.register(ErrorCode::new(
            LIBRARY_NAME_MISMATCH,
            "Library",
            "Files disagree about the library name",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_LIBRARY_NAME,
            "Library",
            "Invalid library name",
            Some("Library name components must be lowercase alphanumeric and start with a letter"),
        ));
        self.register(ErrorCode::new(
            UNUSED_IMPORT,
            "Library",
            "Unused import",
            Some("Either use the library, or remove the import"),
        ));
        self.register(ErrorCode::new(
            DEPENDENCY_FAILED,
            "Library",
            "Imported library failed to compile",
            None,
        ));
        self.register(ErrorCode::new(
            DUPLICATE_LIBRARY,
            "Library",
            "Library compiled twice",
            None,
        ));
    }

    /// Get all error codes in a specific range
    pub fn get_range(&self, start: u16, end: u16) -> Vec<&ErrorCode> {
        let mut codes: Vec<&ErrorCode> = self
            .codes
            .values()
            .filter(|code| code.code >= start && code.code <= end)
            .collect();
        codes.sort_by_key(|code| code.code);
        codes
    }

    pub fn get_name_errors(&self) -> Vec<&ErrorCode> {
        self.get_range(1000, 1999)
    }

    pub fn get_type_errors(&self) -> Vec<&ErrorCode> {
        self.get_range(2000, 2999)
    }

    pub fn get_constant_errors(&self) -> Vec<&ErrorCode> {
        self.get_range(3000, 3999)
    }

    pub fn get_attribute_errors(&self) -> Vec<&ErrorCode> {
        self.get_range(6000, 6999)
    }

    pub fn is_valid_code(&self, code: u16) -> bool {
        self.codes.contains_key(&code)
    }
}

static REGISTRY: std::sync::OnceLock<ErrorCodeRegistry> = std::sync::OnceLock::new();

/// Get the global error code registry
pub fn error_registry() -> &'static ErrorCodeRegistry {
    REGISTRY.get_or_init(ErrorCodeRegistry::new)
}

pub fn get_error_code(code: u16) -> Option<&'static ErrorCode> {
    error_registry().get(code)
}

/// Helper function to format error code string (e.g., 1001 -> "E1001")
pub fn format_error_code(code: u16) -> String {
    format!("E{:04}", code)
}

/// Helper function to parse error code from string (e.g., "E1001" -> Some(1001))
pub fn parse_error_code(code_str: &str) -> Option<u16> {
    code_str.strip_prefix('E')?.parse::<u16>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_creation() {
        let code = ErrorCode::new(1001, "Name", "Name collision", Some("Rename"));
        assert_eq!(code.code, 1001);
        assert_eq!(code.category, "Name");
        assert_eq!(code.help, Some("Rename"));
        assert_eq!(code.format_code(), "E1001");
        assert_eq!(code.to_string(), "E1001 [Name]: Name collision");
    }

    #[test]
    fn test_registry_functionality() {
        let registry = ErrorCodeRegistry::new();

        let collision = registry.get(codes::NAME_COLLISION).unwrap();
        assert_eq!(collision.description, "Name collision");

        let by_string = registry.get_by_string("E4006").unwrap();
        assert_eq!(by_string.code, codes::DECLARATION_CYCLE);

        assert!(registry.get(65535).is_none());
        assert!(registry.get_by_string("INVALID").is_none());
    }

    #[test]
    fn test_error_code_ranges() {
        let registry = ErrorCodeRegistry::new();

        let name_errors = registry.get_name_errors();
        assert!(!name_errors.is_empty());
        assert!(name_errors.iter().all(|e| e.category == "Name"));

        let type_errors = registry.get_type_errors();
        assert!(type_errors.iter().all(|e| e.category == "Type"));

        let constant_errors = registry.get_constant_errors();
        assert!(constant_errors.iter().all(|e| e.category == "Constant"));

        let attribute_errors = registry.get_attribute_errors();
        assert!(attribute_errors.iter().all(|e| e.category == "Attribute"));

        // Sorted by code
        let codes: Vec<u16> = type_errors.iter().map(|e| e.code).collect();
        let mut sorted = codes.clone();
        sorted.sort();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn test_global_registry() {
        let reg1 = error_registry();
        let reg2 = error_registry();
        assert!(std::ptr::eq(reg1, reg2));

        assert!(reg1.is_valid_code(codes::UNUSED_IMPORT));
        assert!(reg1.is_valid_code(codes::DUPLICATE_METHOD_ORDINAL));
        assert!(!reg1.is_valid_code(65000));
    }

    #[test]
    fn test_helper_functions() {
        assert_eq!(format_error_code(1001), "E1001");
        assert_eq!(format_error_code(42), "E0042");

        assert_eq!(parse_error_code("E1001"), Some(1001));
        assert_eq!(parse_error_code("E0042"), Some(42));
        assert_eq!(parse_error_code("1001"), None);
        assert_eq!(parse_error_code("INVALID"), None);

        let code = get_error_code(codes::UNUSED_IMPORT).unwrap();
        assert_eq!(code.category, "Library");
    }
}
