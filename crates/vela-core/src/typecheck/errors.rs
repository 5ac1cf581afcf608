//! Type checking error types and result types.

use thiserror::Error;

use crate::ast::Span;
use crate::diagnostics::{DiagnosticCode, Severity};
use crate::elements::ElementId;

/// Broad family of a type error; the reporting side maps it to a severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Resolution,
    Assignability,
    Arity,
    Structural,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Resolution => "resolution",
            ErrorCategory::Assignability => "assignability",
            ErrorCategory::Arity => "arity",
            ErrorCategory::Structural => "structural",
            ErrorCategory::Internal => "internal",
        }
    }

    /// Type mismatches are warnings under optional typing; anything that
    /// leaves the program without a meaning is an error.
    pub fn default_severity(&self) -> Severity {
        match self {
            ErrorCategory::Assignability | ErrorCategory::Arity => Severity::Warning,
            ErrorCategory::Resolution | ErrorCategory::Structural | ErrorCategory::Internal => {
                Severity::Error
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeErrorCode {
    CannotResolve,
    MemberNotFound,
    StaticMemberAccessedThroughInstance,
    InstanceMemberAccessedStatically,
    ThisOutsideInstance,
    NotAssignableTarget,
    OperatorNotDefined,
    NotAFunction,
    FieldHasNoGetter,
    FieldHasNoSetter,

    IncompatibleAssignment,
    IncompatibleArgument,
    IncompatibleReturn,
    IncompatibleCaseExpression,
    IncompatibleElement,
    ConditionNotBool,

    MissingArgument,
    ExtraArgument,
    NoSuchNamedParameter,
    DuplicateNamedArgument,
    NamedArgumentUsedPositionally,

    AbstractClassInstantiation,
    UnimplementedAbstractMembers,
    OverrideStaticMismatch,
    OverrideInstanceMismatch,
    OverrideRequiredParameterCount,
    OverrideNamedParameters,
    OverrideDefaultValue,
    OverrideTypeMismatch,
    OverrideKindMismatch,
    DefaultConstructorMismatch,
    DefaultConstructorMissing,
    TypeArgumentNotWithinBounds,
    DuplicateMapKey,

    InternalError,
}

impl TypeErrorCode {
    /// Stable identifier, e.g. `T0201`.
    pub fn code(&self) -> &'static str {
        use TypeErrorCode::*;
        match self {
            CannotResolve => "T0101",
            MemberNotFound => "T0102",
            StaticMemberAccessedThroughInstance => "T0103",
            InstanceMemberAccessedStatically => "T0104",
            ThisOutsideInstance => "T0105",
            NotAssignableTarget => "T0106",
            OperatorNotDefined => "T0107",
            NotAFunction => "T0108",
            FieldHasNoGetter => "T0109",
            FieldHasNoSetter => "T0110",
            IncompatibleAssignment => "T0201",
            IncompatibleArgument => "T0202",
            IncompatibleReturn => "T0203",
            IncompatibleCaseExpression => "T0204",
            IncompatibleElement => "T0205",
            ConditionNotBool => "T0206",
            MissingArgument => "T0301",
            ExtraArgument => "T0302",
            NoSuchNamedParameter => "T0303",
            DuplicateNamedArgument => "T0304",
            NamedArgumentUsedPositionally => "T0305",
            AbstractClassInstantiation => "T0401",
            UnimplementedAbstractMembers => "T0402",
            OverrideStaticMismatch => "T0403",
            OverrideInstanceMismatch => "T0404",
            OverrideRequiredParameterCount => "T0405",
            OverrideNamedParameters => "T0406",
            OverrideDefaultValue => "T0407",
            OverrideTypeMismatch => "T0408",
            OverrideKindMismatch => "T0409",
            DefaultConstructorMismatch => "T0410",
            DefaultConstructorMissing => "T0411",
            TypeArgumentNotWithinBounds => "T0412",
            DuplicateMapKey => "T0413",
            InternalError => "T0901",
        }
    }

    pub fn title(&self) -> &'static str {
        use TypeErrorCode::*;
        match self {
            CannotResolve => "cannot resolve",
            MemberNotFound => "member not found",
            StaticMemberAccessedThroughInstance => "static member accessed through instance",
            InstanceMemberAccessedStatically => "instance member accessed statically",
            ThisOutsideInstance => "`this` outside an instance context",
            NotAssignableTarget => "invalid assignment target",
            OperatorNotDefined => "operator not defined",
            NotAFunction => "not a function",
            FieldHasNoGetter => "field has no getter",
            FieldHasNoSetter => "field has no setter",
            IncompatibleAssignment => "incompatible assignment",
            IncompatibleArgument => "incompatible argument",
            IncompatibleReturn => "incompatible return value",
            IncompatibleCaseExpression => "incompatible case expression",
            IncompatibleElement => "incompatible collection element",
            ConditionNotBool => "condition is not bool",
            MissingArgument => "missing argument",
            ExtraArgument => "extra argument",
            NoSuchNamedParameter => "no such named parameter",
            DuplicateNamedArgument => "duplicate named argument",
            NamedArgumentUsedPositionally => "named parameter already bound positionally",
            AbstractClassInstantiation => "abstract class instantiated",
            UnimplementedAbstractMembers => "unimplemented abstract members",
            OverrideStaticMismatch => "static member overrides instance member",
            OverrideInstanceMismatch => "instance member overrides static member",
            OverrideRequiredParameterCount => "override changes required parameter count",
            OverrideNamedParameters => "override changes named parameters",
            OverrideDefaultValue => "override changes default value",
            OverrideTypeMismatch => "override type mismatch",
            OverrideKindMismatch => "override changes member kind",
            DefaultConstructorMismatch => "default class constructor mismatch",
            DefaultConstructorMissing => "default class constructor missing",
            TypeArgumentNotWithinBounds => "type argument not within bounds",
            DuplicateMapKey => "duplicate map key",
            InternalError => "internal checker error",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        use TypeErrorCode::*;
        match self {
            CannotResolve
            | MemberNotFound
            | StaticMemberAccessedThroughInstance
            | InstanceMemberAccessedStatically
            | ThisOutsideInstance
            | NotAssignableTarget
            | OperatorNotDefined
            | NotAFunction
            | FieldHasNoGetter
            | FieldHasNoSetter => ErrorCategory::Resolution,
            IncompatibleAssignment
            | IncompatibleArgument
            | IncompatibleReturn
            | IncompatibleCaseExpression
            | IncompatibleElement
            | ConditionNotBool => ErrorCategory::Assignability,
            MissingArgument
            | ExtraArgument
            | NoSuchNamedParameter
            | DuplicateNamedArgument
            | NamedArgumentUsedPositionally => ErrorCategory::Arity,
            AbstractClassInstantiation
            | UnimplementedAbstractMembers
            | OverrideStaticMismatch
            | OverrideInstanceMismatch
            | OverrideRequiredParameterCount
            | OverrideNamedParameters
            | OverrideDefaultValue
            | OverrideTypeMismatch
            | OverrideKindMismatch
            | DefaultConstructorMismatch
            | DefaultConstructorMissing
            | TypeArgumentNotWithinBounds
            | DuplicateMapKey => ErrorCategory::Structural,
            InternalError => ErrorCategory::Internal,
        }
    }

    pub fn diagnostic_code(&self) -> DiagnosticCode {
        DiagnosticCode::new(self.code(), self.title())
    }
}

/// A type error with message and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub code: TypeErrorCode,
    pub span: Span,
    pub message: String,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

impl TypeError {
    pub fn new(code: TypeErrorCode, span: Span, message: impl Into<String>) -> Self {
        TypeError {
            code,
            span,
            message: message.into(),
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Receives every error the checker reports.
pub trait DiagnosticSink {
    fn report(&mut self, error: TypeError);
}

impl DiagnosticSink for Vec<TypeError> {
    fn report(&mut self, error: TypeError) {
        self.push(error);
    }
}

/// The tree or element table broke an assumption the checker relies on.
/// Checking of the affected unit stops; other units are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("element {0:?} is not in the element table")]
    UnknownElement(ElementId),
    #[error("'{owner}' refers to element {id:?}, which is not in the element table")]
    DanglingReference { owner: String, id: ElementId },
    #[error("function '{name}' has no function type")]
    MissingSignature { name: String },
    #[error("class declaration refers to '{name}', which is not a class")]
    NotAClass { name: String },
}

/// Result type for type checking operations.
pub type TypecheckResult<T> = Result<T, Vec<TypeError>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        use TypeErrorCode::*;
        let all = [
            CannotResolve,
            MemberNotFound,
            StaticMemberAccessedThroughInstance,
            InstanceMemberAccessedStatically,
            ThisOutsideInstance,
            NotAssignableTarget,
            OperatorNotDefined,
            NotAFunction,
            FieldHasNoGetter,
            FieldHasNoSetter,
            IncompatibleAssignment,
            IncompatibleArgument,
            IncompatibleReturn,
            IncompatibleCaseExpression,
            IncompatibleElement,
            ConditionNotBool,
            MissingArgument,
            ExtraArgument,
            NoSuchNamedParameter,
            DuplicateNamedArgument,
            NamedArgumentUsedPositionally,
            AbstractClassInstantiation,
            UnimplementedAbstractMembers,
            OverrideStaticMismatch,
            OverrideInstanceMismatch,
            OverrideRequiredParameterCount,
            OverrideNamedParameters,
            OverrideDefaultValue,
            OverrideTypeMismatch,
            OverrideKindMismatch,
            DefaultConstructorMismatch,
            DefaultConstructorMissing,
            TypeArgumentNotWithinBounds,
            DuplicateMapKey,
            InternalError,
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|c| c.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_categories_map_to_severities() {
        assert_eq!(
            TypeErrorCode::IncompatibleArgument.category().default_severity(),
            Severity::Warning
        );
        assert_eq!(
            TypeErrorCode::UnimplementedAbstractMembers
                .category()
                .default_severity(),
            Severity::Error
        );
        assert_eq!(TypeErrorCode::InternalError.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_sink_collects() {
        let mut sink: Vec<TypeError> = Vec::new();
        sink.report(TypeError::new(
            TypeErrorCode::CannotResolve,
            Span::new(0, 1),
            "cannot resolve 'x'",
        ));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].code.code(), "T0101");
    }

    #[test]
    fn test_internal_error_message() {
        let err = InternalError::UnknownElement(ElementId(99));
        assert!(err.to_string().contains("ElementId(99)"));
    }
}
